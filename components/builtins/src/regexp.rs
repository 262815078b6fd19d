//! RegExp constructor and RegExp.prototype methods

use interpreter::object::ObjectKind;
use interpreter::value::utf16_len;
use interpreter::{Control, Interpreter, ObjectRef, Value};
use regex::Regex;

use crate::value::{arg, define_constructor, define_method, to_integer, Builtin, JsResult};

/// A located match: byte offsets into the subject plus capture groups
#[derive(Debug, Clone)]
pub struct Match {
    /// Byte offset of the match start
    pub start: usize,
    /// Byte offset one past the match end
    pub end: usize,
    /// Capture groups `1..`, `None` when a group did not participate
    pub groups: Vec<Option<(usize, usize)>>,
}

impl Match {
    /// Match without capture groups
    pub fn literal(start: usize, end: usize) -> Self {
        Match {
            start,
            end,
            groups: Vec::new(),
        }
    }

    fn from_captures(captures: &regex::Captures<'_>) -> Option<Self> {
        let whole = captures.get(0)?;
        Some(Match {
            start: whole.start(),
            end: whole.end(),
            groups: (1..captures.len())
                .map(|i| captures.get(i).map(|m| (m.start(), m.end())))
                .collect(),
        })
    }

    /// The matched text
    pub fn text<'s>(&self, subject: &'s str) -> &'s str {
        &subject[self.start..self.end]
    }
}

/// The compiled matcher and flags of a RegExp object
pub fn compiled(object: &ObjectRef) -> Option<(Regex, String)> {
    match &object.borrow().kind {
        ObjectKind::RegExp(data) => Some((data.regex.clone(), data.flags.clone())),
        _ => None,
    }
}

/// Up to `limit` successive non-overlapping matches
pub fn find_matches(regex: &Regex, subject: &str, limit: usize) -> Vec<Match> {
    regex
        .captures_iter(subject)
        .take(limit)
        .filter_map(|captures| Match::from_captures(&captures))
        .collect()
}

/// RegExp constructor and prototype methods
pub struct RegExpPrototype;

impl RegExpPrototype {
    /// Install `RegExp` and `RegExp.prototype`
    pub fn install(interp: &mut Interpreter) {
        let prototype = interp.realm.intrinsics().regexp_prototype.clone();
        define_constructor(interp, "RegExp", 2, &prototype, Self::construct);

        let methods: &[(&str, usize, Builtin)] = &[
            ("exec", 1, Self::exec),
            ("test", 1, Self::test),
            ("toString", 0, Self::to_string),
        ];
        for (name, length, func) in methods {
            define_method(interp, &prototype, name, *length, *func);
        }
    }

    /// RegExp(pattern, flags)
    pub fn construct(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let (source, inherited_flags) = match args.first() {
            Some(Value::Object(object)) if object.is_regexp() => match &object.borrow().kind {
                ObjectKind::RegExp(data) => (data.source.clone(), data.flags.clone()),
                _ => (String::new(), String::new()),
            },
            None | Some(Value::Undefined) => ("(?:)".to_string(), String::new()),
            Some(value) => (interp.to_string(value)?.to_string(), String::new()),
        };
        let flags = match args.get(1) {
            None | Some(Value::Undefined) => inherited_flags,
            Some(value) => interp.to_string(value)?.to_string(),
        };
        let regexp = interp
            .realm
            .new_regexp(&source, &flags)
            .map_err(|e| interp.throw_js_error(&e))?;
        Ok(Value::Object(regexp))
    }

    /// RegExp.prototype.exec(string)
    pub fn exec(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let regexp = this_regexp(interp, &this, "exec")?;
        let subject = interp.to_string(&arg(args, 0))?;
        let found = match exec_at_last_index(interp, &regexp, &subject)? {
            Some(found) => found,
            None => return Ok(Value::Null),
        };

        let (regex, _) = compiled(&regexp).ok_or_else(|| interp.type_error("Invalid regexp"))?;
        let mut elements = vec![Value::from(found.text(&subject))];
        elements.extend(found.groups.iter().map(|group| match group {
            Some((start, end)) => Value::from(&subject[*start..*end]),
            None => Value::Undefined,
        }));
        let result = interp.realm.new_array(elements);
        result.put("index", Value::Number(utf16_len(&subject[..found.start]) as f64));
        result.put("input", Value::String(subject.clone()));

        let names: Vec<(usize, &str)> = regex
            .capture_names()
            .enumerate()
            .filter_map(|(i, name)| name.map(|name| (i, name)))
            .collect();
        if names.is_empty() {
            result.put("groups", Value::Undefined);
        } else {
            let groups = interp.realm.new_object();
            for (index, name) in names {
                let value = match found.groups.get(index - 1) {
                    Some(Some((start, end))) => Value::from(&subject[*start..*end]),
                    _ => Value::Undefined,
                };
                groups.put(name, value);
            }
            result.put("groups", Value::Object(groups));
        }
        Ok(Value::Object(result))
    }

    /// RegExp.prototype.test(string)
    pub fn test(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let regexp = this_regexp(interp, &this, "test")?;
        let subject = interp.to_string(&arg(args, 0))?;
        Ok(Value::Boolean(exec_at_last_index(interp, &regexp, &subject)?.is_some()))
    }

    /// RegExp.prototype.toString()
    pub fn to_string(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        let regexp = this_regexp(interp, &this, "toString")?;
        let source = interp.to_string(&regexp.get("source"))?;
        let flags = interp.to_string(&regexp.get("flags"))?;
        Ok(Value::from(format!("/{}/{}", source, flags)))
    }
}

fn this_regexp(interp: &Interpreter, this: &Value, method: &str) -> Result<ObjectRef, Control> {
    match this {
        Value::Object(object) if object.is_regexp() => Ok(object.clone()),
        other => Err(interp.type_error(format!(
            "RegExp.prototype.{} called on incompatible receiver {}",
            method,
            interp.describe(other)
        ))),
    }
}

/// Run one match honouring `lastIndex` for global and sticky expressions
fn exec_at_last_index(interp: &mut Interpreter, regexp: &ObjectRef, subject: &str) -> Result<Option<Match>, Control> {
    let (regex, flags) = compiled(regexp).ok_or_else(|| interp.type_error("Invalid regexp"))?;
    let global = flags.contains('g');
    let sticky = flags.contains('y');
    if !global && !sticky {
        return Ok(regex.captures(subject).as_ref().and_then(Match::from_captures));
    }

    let last_index = to_integer(interp, &regexp.get("lastIndex"))?;
    let start = if last_index < 0.0 {
        None
    } else {
        utf16_to_byte(subject, last_index as usize)
    };
    let found = start.and_then(|start| {
        regex
            .captures_at(subject, start)
            .as_ref()
            .and_then(Match::from_captures)
            .filter(|m| !sticky || m.start == start)
    });
    let next = match &found {
        Some(m) => {
            let end = utf16_len(&subject[..m.end]);
            if m.end == m.start && end == last_index as usize {
                end + 1
            } else {
                end
            }
        }
        None => 0,
    };
    regexp.set("lastIndex", Value::Number(next as f64));
    Ok(found)
}

/// Byte offset of UTF-16 position `index`, if it lies within the string
fn utf16_to_byte(s: &str, index: usize) -> Option<usize> {
    let mut units = 0;
    for (byte, c) in s.char_indices() {
        if units >= index {
            return Some(byte);
        }
        units += c.len_utf16();
    }
    (units >= index).then_some(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> String {
        let mut interp = Interpreter::new();
        crate::install(&mut interp);
        let value = interp.eval_source(source).unwrap();
        crate::inspect(&value)
    }

    #[test]
    fn test_test_and_exec() {
        assert_eq!(eval("/ab+c/.test('xxabbbc')"), "true");
        assert_eq!(eval("/(\\d+)-(\\d+)/.exec('10-20')[2]"), "'20'");
        assert_eq!(eval("/(\\d+)/.exec('ab12').index"), "2");
        assert_eq!(eval("/z/.exec('abc')"), "null");
    }

    #[test]
    fn test_global_last_index() {
        assert_eq!(
            eval("const r = /a/g; [r.test('aa'), r.lastIndex, r.test('aa'), r.test('aa'), r.lastIndex]"),
            "[ true, 1, true, false, 0 ]"
        );
    }

    #[test]
    fn test_named_groups() {
        assert_eq!(eval("/(?<year>\\d{4})/.exec('in 2024').groups.year"), "'2024'");
    }

    #[test]
    fn test_constructor() {
        assert_eq!(eval("new RegExp('a.c', 'i').test('ABC')"), "true");
        assert_eq!(eval("String(new RegExp('x', 'g'))"), "'/x/g'");
        assert_eq!(eval("RegExp(/q/m).flags"), "'m'");
    }

    #[test]
    fn test_invalid_pattern_is_syntax_error() {
        assert_eq!(eval("let n; try { new RegExp('(') } catch (e) { n = e.name } n"), "'SyntaxError'");
    }

    #[test]
    fn test_utf16_to_byte() {
        assert_eq!(utf16_to_byte("a😀b", 0), Some(0));
        assert_eq!(utf16_to_byte("a😀b", 3), Some(5));
        assert_eq!(utf16_to_byte("ab", 2), Some(2));
        assert_eq!(utf16_to_byte("ab", 3), None);
    }
}
