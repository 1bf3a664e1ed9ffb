//! `CodeRunner` backed by the page's own JS engine.
//!
//! `new Function("input", code)` builds the callable, and values cross
//! the boundary as JSON text. Construction and invocation both go through
//! catching bindings, so a syntax error or a throw comes back as an
//! `ExecError` instead of aborting the module.

use js_sys::{Array, Function, JSON, Reflect};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wf_editor::{CodeRunner, ExecError};

pub struct JsCodeRunner;

impl CodeRunner for JsCodeRunner {
    fn run(&self, code: &str, input: &Value) -> Result<Value, ExecError> {
        let function = compile(code)?;
        let input = to_js(input)?;
        let output = function
            .call1(&JsValue::NULL, &input)
            .map_err(|e| ExecError::Runtime(describe(&e)))?;
        from_js(&output)
    }
}

fn compile(code: &str) -> Result<Function, ExecError> {
    let ctor = Reflect::get(&js_sys::global(), &JsValue::from_str("Function"))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
        .ok_or_else(|| ExecError::Compile("Function constructor unavailable".into()))?;
    let args = Array::of2(&JsValue::from_str("input"), &JsValue::from_str(code));
    Reflect::construct(&ctor, &args)
        .map_err(|e| ExecError::Compile(describe(&e)))?
        .dyn_into::<Function>()
        .map_err(|_| ExecError::Compile("constructor did not return a function".into()))
}

fn to_js(value: &Value) -> Result<JsValue, ExecError> {
    let text = serde_json::to_string(value).map_err(|e| ExecError::Runtime(e.to_string()))?;
    JSON::parse(&text).map_err(|e| ExecError::Runtime(describe(&e)))
}

fn from_js(value: &JsValue) -> Result<Value, ExecError> {
    if value.is_undefined() {
        return Ok(Value::Null);
    }
    let text = JSON::stringify(value)
        .map_err(|e| ExecError::Runtime(describe(&e)))?
        .as_string()
        .unwrap_or_default();
    if text.is_empty() {
        // Functions and symbols have no JSON form.
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| ExecError::Runtime(e.to_string()))
}

fn describe(err: &JsValue) -> String {
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return String::from(e.message());
    }
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}
