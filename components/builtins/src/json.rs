//! JSON object methods

use interpreter::{Control, Interpreter, ObjectRef, Value};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::value::{arg, define_method, define_namespace, JsResult};

const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

/// JSON object with static methods
pub struct JSONObject;

impl JSONObject {
    /// Install the global `JSON` namespace
    pub fn install(interp: &mut Interpreter) {
        let json = define_namespace(interp, "JSON");
        define_method(interp, &json, "parse", 2, Self::parse);
        define_method(interp, &json, "stringify", 3, Self::stringify);
    }

    /// JSON.parse(text, reviver)
    pub fn parse(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let text = interp.to_string(&arg(args, 0))?;
        let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            interp.throw_error(
                core_types::ErrorKind::SyntaxError,
                format!("Unexpected token in JSON: {}", e),
            )
        })?;
        let value = Self::json_to_js_value(interp, &json);

        let reviver = arg(args, 1);
        if !reviver.is_callable() {
            return Ok(value);
        }
        let holder = interp.realm.new_object();
        holder.put("", value);
        revive(interp, &Value::Object(holder), "", &reviver)
    }

    /// JSON.stringify(value, replacer, space)
    pub fn stringify(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let replacer = arg(args, 1);
        let allow_list = match &replacer {
            Value::Object(list) if list.is_array() => {
                let mut keys = Vec::new();
                for key in list.array_elements() {
                    if matches!(key, Value::String(_) | Value::Number(_)) {
                        keys.push(interp.to_string(&key)?.to_string());
                    }
                }
                Some(keys)
            }
            _ => None,
        };
        let indent = indent_of(&arg(args, 2));

        let mut serializer = Serializer {
            replacer: replacer.is_callable().then_some(replacer.clone()),
            allow_list,
            stack: Vec::new(),
        };
        let holder = interp.realm.new_object();
        holder.put("", arg(args, 0));
        let json = match serializer.serialize_property(interp, &holder, "")? {
            Some(json) => json,
            None => return Ok(Value::Undefined),
        };

        let text = if indent.is_empty() {
            serde_json::to_string(&json)
        } else {
            to_pretty_string(&json, &indent)
        };
        text.map(Value::from)
            .map_err(|e| interp.type_error(format!("JSON serialization failed: {}", e)))
    }

    /// Convert serde_json::Value to a script value
    pub fn json_to_js_value(interp: &Interpreter, json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => {
                let elements = items.iter().map(|item| Self::json_to_js_value(interp, item)).collect();
                Value::Object(interp.realm.new_array(elements))
            }
            serde_json::Value::Object(map) => {
                let object = interp.realm.new_object();
                for (key, item) in map {
                    object.put(key, Self::json_to_js_value(interp, item));
                }
                Value::Object(object)
            }
        }
    }
}

/// Number as JSON: integral values print without a fraction, non-finite as null
pub fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn indent_of(space: &Value) -> String {
    match space {
        Value::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    }
}

fn to_pretty_string(json: &serde_json::Value, indent: &str) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let mut writer = serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(indent.as_bytes()));
    json.serialize(&mut writer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

struct Serializer {
    replacer: Option<Value>,
    allow_list: Option<Vec<String>>,
    stack: Vec<usize>,
}

impl Serializer {
    /// SerializeJSONProperty: `None` means the property is omitted
    fn serialize_property(
        &mut self,
        interp: &mut Interpreter,
        holder: &ObjectRef,
        key: &str,
    ) -> Result<Option<serde_json::Value>, Control> {
        let mut value = holder.get(key);
        if let Value::Object(object) = &value {
            let to_json = object.get("toJSON");
            if to_json.is_callable() {
                value = interp.call(&to_json, value.clone(), &[Value::from(key)])?;
            }
        }
        if let Some(replacer) = &self.replacer {
            value = interp.call(replacer, Value::Object(holder.clone()), &[Value::from(key), value])?;
        }

        Ok(Some(match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Number(n) => number_to_json(n),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Undefined => return Ok(None),
            Value::Object(object) if object.is_callable() => return Ok(None),
            Value::Object(object) => self.serialize_object(interp, &object)?,
        }))
    }

    fn serialize_object(&mut self, interp: &mut Interpreter, object: &ObjectRef) -> Result<serde_json::Value, Control> {
        if self.stack.contains(&object.id()) {
            return Err(interp.type_error("Converting circular structure to JSON"));
        }
        self.stack.push(object.id());

        let result = if object.is_array() {
            let length = object.array_elements().len();
            let mut items = Vec::with_capacity(length);
            for index in 0..length {
                let item = self.serialize_property(interp, object, &index.to_string())?;
                items.push(item.unwrap_or(serde_json::Value::Null));
            }
            serde_json::Value::Array(items)
        } else {
            let keys: Vec<String> = match &self.allow_list {
                Some(list) => list.clone(),
                None => object.own_keys().iter().map(|k| k.to_string()).collect(),
            };
            let mut map = serde_json::Map::new();
            for key in keys {
                if let Some(item) = self.serialize_property(interp, object, &key)? {
                    map.insert(key, item);
                }
            }
            serde_json::Value::Object(map)
        };

        self.stack.pop();
        Ok(result)
    }
}

fn revive(interp: &mut Interpreter, holder: &Value, key: &str, reviver: &Value) -> JsResult {
    let value = interp.get(holder, key)?;
    if let Value::Object(object) = &value {
        let keys: Vec<String> = if object.is_array() {
            (0..object.array_elements().len()).map(|i| i.to_string()).collect()
        } else {
            object.own_keys().iter().map(|k| k.to_string()).collect()
        };
        for child in keys {
            let revived = revive(interp, &value, &child, reviver)?;
            if revived.is_undefined() && !object.is_array() {
                object.delete(&child);
            } else {
                object.set(&child, revived);
            }
        }
    }
    interp.call(reviver, holder.clone(), &[Value::from(key), value])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> String {
        let mut interp = Interpreter::new();
        crate::install(&mut interp);
        let value = interp.eval_source(source).unwrap();
        crate::display(&value)
    }

    #[test]
    fn test_stringify_compact() {
        assert_eq!(eval("JSON.stringify({ b: 1, a: [1, 'x', null, true] })"), r#"{"b":1,"a":[1,"x",null,true]}"#);
        assert_eq!(eval("JSON.stringify({ f() {}, u: undefined, n: NaN, d: 1.5 })"), r#"{"n":null,"d":1.5}"#);
        assert_eq!(eval("JSON.stringify([undefined, () => 1])"), "[null,null]");
        assert_eq!(eval("JSON.stringify(undefined)"), "undefined");
        assert_eq!(eval("JSON.stringify('q\"')"), r#""q\"""#);
    }

    #[test]
    fn test_stringify_indent() {
        assert_eq!(eval("JSON.stringify({ a: [1] }, null, 2)"), "{\n  \"a\": [\n    1\n  ]\n}");
        assert_eq!(eval("JSON.stringify({}, null, 2)"), "{}");
    }

    #[test]
    fn test_stringify_replacer_and_to_json() {
        assert_eq!(eval("JSON.stringify({ a: 1, b: 2 }, ['b'])"), r#"{"b":2}"#);
        assert_eq!(
            eval("JSON.stringify({ a: 1, b: 'x' }, (k, v) => typeof v === 'number' ? v * 10 : v)"),
            r#"{"a":10,"b":"x"}"#
        );
        assert_eq!(eval("JSON.stringify({ toJSON() { return 42; } })"), "42");
    }

    #[test]
    fn test_stringify_circular() {
        assert_eq!(
            eval("const o = {}; o.o = o; let m; try { JSON.stringify(o) } catch (e) { m = e.message } m"),
            "Converting circular structure to JSON"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(eval("JSON.parse('{\"z\":1,\"a\":[true,null]}').a[0]"), "true");
        assert_eq!(eval("Object.keys(JSON.parse('{\"z\":1,\"a\":2}')).join()"), "z,a");
        assert_eq!(eval("JSON.parse('[1,2]', (k, v) => typeof v === 'number' ? v + 1 : v).join()"), "2,3");
    }

    #[test]
    fn test_parse_error_is_syntax_error() {
        assert_eq!(eval("let n; try { JSON.parse('{bad') } catch (e) { n = e.name } n"), "SyntaxError");
    }

    #[test]
    fn test_number_to_json() {
        assert_eq!(number_to_json(3.0), serde_json::json!(3));
        assert_eq!(number_to_json(f64::INFINITY), serde_json::Value::Null);
    }
}
