//! Page-side scripts used by the Chromium driver.
//!
//! Every template is an expression evaluated in the top-level window. Element
//! handles are `data-fundstat-ref` tags stamped on first lookup; a handle
//! whose tag is gone from its document is reported as `stale`.

use serde_json::Value;

use crate::locator::{ElementRef, FrameTarget, Locator};

const PRELUDE: &str = r#"
const __docFor = (name) => {
  if (name === null) return document;
  const sel = `frame[name="${CSS.escape(name)}"], iframe[name="${CSS.escape(name)}"]`;
  const host = document.querySelector(sel);
  if (host) {
    try { if (host.contentDocument) return host.contentDocument; } catch (e) {}
  }
  try {
    const w = window.frames[name];
    if (w && w.document) return w.document;
  } catch (e) {}
  return null;
};
const __frameOffset = (name) => {
  if (name === null) return { x: 0, y: 0 };
  const host = document.querySelector(`frame[name="${CSS.escape(name)}"], iframe[name="${CSS.escape(name)}"]`);
  if (!host) return { x: 0, y: 0 };
  const r = host.getBoundingClientRect();
  return { x: r.left + (host.clientLeft || 0), y: r.top + (host.clientTop || 0) };
};
const __el = (name, ref) => {
  const doc = __docFor(name);
  if (!doc) return null;
  return doc.querySelector(`[data-fundstat-ref="${ref}"]`);
};
const __tag = (el) => {
  if (!el.hasAttribute('data-fundstat-ref')) {
    window.__fundstatSeq = (window.__fundstatSeq || 0) + 1;
    el.setAttribute('data-fundstat-ref', 'r' + window.__fundstatSeq);
  }
  return el.getAttribute('data-fundstat-ref');
};
"#;

const FIND_BODY: &str = r#"
const doc = __docFor(__FRAME__);
if (!doc) return { status: 'missing_frame' };
const by = __BY__;
const expr = __EXPR__;
const scopeRef = __SCOPE__;
let root = doc;
if (scopeRef !== null) {
  root = doc.querySelector(`[data-fundstat-ref="${scopeRef}"]`);
  if (!root) return { status: 'stale' };
}
let nodes = [];
if (by === 'xpath') {
  const snap = doc.evaluate(expr, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
  for (let i = 0; i < snap.snapshotLength; i++) {
    const n = snap.snapshotItem(i);
    if (n && n.nodeType === 1) nodes.push(n);
  }
} else if (by === 'css') {
  nodes = Array.from(root.querySelectorAll(expr));
} else {
  const n = doc.getElementById(expr);
  if (n && (root === doc || root.contains(n))) nodes = [n];
}
return { status: 'ok', refs: nodes.map(__tag) };
"#;

const ELEMENT_BODY: &str = r#"
const el = __el(__FRAME__, __REF__);
if (!el) return { status: 'stale' };
const arg = __ARG__;
switch (__OP__) {
  case 'text': {
    const raw = el.innerText !== undefined ? el.innerText : el.textContent;
    return { status: 'ok', value: (raw || '').trim() };
  }
  case 'attr': {
    let v = el.getAttribute(arg);
    if (v === null && arg in el) {
      const p = el[arg];
      if (p !== null && typeof p !== 'object' && typeof p !== 'function') v = String(p);
    }
    return { status: 'ok', value: v };
  }
  case 'displayed': {
    const view = el.ownerDocument.defaultView;
    const style = view ? view.getComputedStyle(el) : null;
    const r = el.getBoundingClientRect();
    const shown = r.width > 0 && r.height > 0 && (!style || (style.visibility !== 'hidden' && style.display !== 'none'));
    return { status: 'ok', value: shown };
  }
  case 'enabled':
    return { status: 'ok', value: !(el.disabled === true || el.hasAttribute('disabled')) };
  case 'scroll':
    el.scrollIntoView({ block: 'center', inline: 'center' });
    return { status: 'ok' };
  case 'click':
    el.click();
    return { status: 'ok' };
  case 'center': {
    const r = el.getBoundingClientRect();
    const off = __frameOffset(__FRAME__);
    return { status: 'ok', x: off.x + r.left + r.width / 2, y: off.y + r.top + r.height / 2, w: r.width, h: r.height };
  }
  default:
    return { status: 'unsupported' };
}
"#;

const FRAME_PROBE_BODY: &str = r#"
return { status: __docFor(__FRAME__) ? 'ok' : 'missing_frame' };
"#;

const SOURCE_BODY: &str = r#"
const doc = __docFor(__FRAME__);
if (!doc) return { status: 'missing_frame' };
return { status: 'ok', value: doc.documentElement ? doc.documentElement.outerHTML : '' };
"#;

fn literal<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn frame_literal(frame: &FrameTarget) -> String {
    literal(&frame.name())
}

fn wrap(body: &str) -> String {
    format!("(() => {{{PRELUDE}\n{body}\n}})()")
}

pub(crate) fn find(frame: &FrameTarget, locator: &Locator, scope: Option<&ElementRef>) -> String {
    let body = FIND_BODY
        .replace("__FRAME__", &frame_literal(frame))
        .replace("__BY__", &literal(locator.by.name()))
        .replace("__EXPR__", &literal(&locator.expr))
        .replace("__SCOPE__", &literal(&scope.map(|el| el.id.as_str())));
    wrap(&body)
}

pub(crate) fn element_op(element: &ElementRef, op: &str, arg: Option<&str>) -> String {
    let body = ELEMENT_BODY
        .replace("__FRAME__", &frame_literal(&element.frame))
        .replace("__REF__", &literal(&element.id))
        .replace("__OP__", &literal(op))
        .replace("__ARG__", &literal(&arg));
    wrap(&body)
}

pub(crate) fn frame_probe(frame: &FrameTarget) -> String {
    wrap(&FRAME_PROBE_BODY.replace("__FRAME__", &frame_literal(frame)))
}

pub(crate) fn page_source(frame: &FrameTarget) -> String {
    wrap(&SOURCE_BODY.replace("__FRAME__", &frame_literal(frame)))
}

/// Caller script with `arguments[i]` bound to the resolved element handles.
pub(crate) fn user_script(script: &str, args: &[ElementRef]) -> String {
    let resolved: Vec<String> = args
        .iter()
        .map(|el| format!("__el({}, {})", frame_literal(&el.frame), literal(&el.id)))
        .collect();
    let body = format!(
        "const __args = [{}];\nreturn (function() {{\n{}\n}}).apply(null, __args);",
        resolved.join(", "),
        script
    );
    wrap(&body)
}

pub(crate) fn status(value: &Value) -> &str {
    value
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_script_embeds_literals() {
        let script = find(
            &FrameTarget::named("main"),
            &Locator::xpath("//a[text()=\"펀드\"]"),
            None,
        );
        assert!(script.contains(r#"const by = "xpath";"#));
        assert!(script.contains(r#"__docFor("main")"#));
        assert!(script.contains(r#"const scopeRef = null;"#));
        assert!(script.contains(r#"\"펀드\""#));
    }

    #[test]
    fn test_user_script_binds_arguments() {
        let el = ElementRef::new("r7", FrameTarget::Root);
        let script = user_script("arguments[0].click();", &[el]);
        assert!(script.contains(r#"__el(null, "r7")"#));
        assert!(script.contains("arguments[0].click();"));
    }

    #[test]
    fn test_status_reads_field() {
        assert_eq!(status(&serde_json::json!({"status": "stale"})), "stale");
        assert_eq!(status(&Value::Null), "unknown");
    }
}
