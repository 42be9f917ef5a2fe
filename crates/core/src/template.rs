//! Built-in starter templates.
//!
//! Static seed data; never written to the project store.

use crate::source::SourceTriple;

/// A canned starting point.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    /// Short name for the menu
    pub name: &'static str,
    /// One-line description
    pub description: &'static str,
    pub markup: &'static str,
    pub style: &'static str,
    pub script: &'static str,
}

impl Template {
    pub fn triple(&self) -> SourceTriple {
        SourceTriple::new(self.markup, self.style, self.script)
    }

    /// Case-insensitive lookup by name.
    pub fn find(name: &str) -> Option<&'static Template> {
        TEMPLATES.iter().find(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Template loaded when nothing was autosaved.
    pub fn starter() -> &'static Template {
        &TEMPLATES[1]
    }
}

pub const TEMPLATES: &[Template] = &[
    Template {
        name: "Blank",
        description: "Empty HTML, CSS and JS",
        markup: "",
        style: "",
        script: "",
    },
    Template {
        name: "Hello World",
        description: "A heading, a little style and a console message",
        markup: r#"<h1 id="title">Hello, playground!</h1>
<p>Edit the HTML, CSS or JS and the preview reloads.</p>"#,
        style: r#"body {
  font-family: system-ui, sans-serif;
  margin: 2rem;
  color: #222;
}
h1 {
  color: #3b82f6;
}"#,
        script: r#"const title = document.getElementById('title');
console.log('Title says:', title.textContent);"#,
    },
    Template {
        name: "Counter",
        description: "Button click handling and DOM updates",
        markup: r#"<div class="counter">
  <button id="dec">-</button>
  <span id="value">0</span>
  <button id="inc">+</button>
</div>"#,
        style: r#".counter {
  display: flex;
  gap: 1rem;
  align-items: center;
  font: 2rem system-ui, sans-serif;
}
button {
  font-size: 1.5rem;
  width: 3rem;
}"#,
        script: r#"let count = 0;
const value = document.getElementById('value');
function render() {
  value.textContent = count;
  console.log('count =', count);
}
document.getElementById('inc').addEventListener('click', () => { count++; render(); });
document.getElementById('dec').addEventListener('click', () => { count--; render(); });
render();"#,
    },
    Template {
        name: "Todo List",
        description: "Form input, list rendering and event delegation",
        markup: r#"<form id="form">
  <input id="item" placeholder="What needs doing?" autocomplete="off">
  <button>Add</button>
</form>
<ul id="list"></ul>"#,
        style: r#"body { font-family: system-ui, sans-serif; margin: 2rem; }
li { cursor: pointer; padding: .25rem 0; }
li.done { text-decoration: line-through; color: #888; }"#,
        script: r#"const form = document.getElementById('form');
const input = document.getElementById('item');
const list = document.getElementById('list');

form.addEventListener('submit', (event) => {
  event.preventDefault();
  const text = input.value.trim();
  if (!text) {
    console.warn('Empty todo ignored');
    return;
  }
  const li = document.createElement('li');
  li.textContent = text;
  list.appendChild(li);
  input.value = '';
  console.log('Added', text);
});

list.addEventListener('click', (event) => {
  if (event.target.tagName === 'LI') {
    event.target.classList.toggle('done');
  }
});"#,
    },
    Template {
        name: "Canvas Animation",
        description: "requestAnimationFrame drawing on a canvas",
        markup: r#"<canvas id="stage" width="400" height="240"></canvas>"#,
        style: r#"body { margin: 0; background: #111; display: grid; place-items: center; height: 100vh; }
canvas { background: #1e293b; border-radius: 8px; }"#,
        script: r#"const canvas = document.getElementById('stage');
const ctx = canvas.getContext('2d');
let x = 20, dx = 3;

function frame() {
  ctx.clearRect(0, 0, canvas.width, canvas.height);
  ctx.fillStyle = '#38bdf8';
  ctx.beginPath();
  ctx.arc(x, canvas.height / 2, 16, 0, Math.PI * 2);
  ctx.fill();
  x += dx;
  if (x < 16 || x > canvas.width - 16) dx = -dx;
  requestAnimationFrame(frame);
}
frame();
console.log('Animation started');"#,
    },
];
