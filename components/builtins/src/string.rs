//! String constructor and String.prototype methods
//!
//! Positions and lengths are counted in UTF-16 code units, as scripts see them.

use std::rc::Rc;

use interpreter::value::{exceeds_string_limit, utf16_len, MAX_STRING_LENGTH};
use interpreter::{Control, Interpreter, Value};

use crate::regexp::{self, Match};
use crate::value::{arg, define_constructor, define_method, relative_index, to_integer, Builtin, JsResult};

/// String constructor and prototype methods
pub struct StringPrototype;

impl StringPrototype {
    /// Install `String` and `String.prototype`
    pub fn install(interp: &mut Interpreter) {
        let prototype = interp.realm.intrinsics().string_prototype.clone();
        let constructor = define_constructor(interp, "String", 1, &prototype, Self::construct);
        define_method(interp, &constructor, "fromCharCode", 1, Self::from_char_code);

        let methods: &[(&str, usize, Builtin)] = &[
            ("charAt", 1, Self::char_at),
            ("charCodeAt", 1, Self::char_code_at),
            ("at", 1, Self::at),
            ("indexOf", 1, Self::index_of),
            ("lastIndexOf", 1, Self::last_index_of),
            ("includes", 1, Self::includes),
            ("startsWith", 1, Self::starts_with),
            ("endsWith", 1, Self::ends_with),
            ("slice", 2, Self::slice),
            ("substring", 2, Self::substring),
            ("toUpperCase", 0, Self::to_upper_case),
            ("toLowerCase", 0, Self::to_lower_case),
            ("trim", 0, Self::trim),
            ("trimStart", 0, Self::trim_start),
            ("trimEnd", 0, Self::trim_end),
            ("padStart", 2, Self::pad_start),
            ("padEnd", 2, Self::pad_end),
            ("repeat", 1, Self::repeat),
            ("split", 2, Self::split),
            ("replace", 2, Self::replace),
            ("replaceAll", 2, Self::replace_all),
            ("match", 1, Self::match_regexp),
            ("concat", 1, Self::concat),
            ("localeCompare", 1, Self::locale_compare),
            ("toString", 0, Self::value_of),
            ("valueOf", 0, Self::value_of),
        ];
        for (name, length, func) in methods {
            define_method(interp, &prototype, name, *length, *func);
        }
    }

    /// String(value)
    pub fn construct(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        match args.first() {
            None => Ok(Value::from("")),
            Some(value) => Ok(Value::String(interp.to_string(value)?)),
        }
    }

    /// String.fromCharCode(...codes)
    pub fn from_char_code(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let mut units = Vec::with_capacity(args.len());
        for code in args {
            units.push(interpreter::value::to_uint32(interp.to_number(code)?) as u16);
        }
        Ok(Value::from(String::from_utf16_lossy(&units)))
    }

    /// String.prototype.charAt(index)
    pub fn char_at(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let units = this_units(interp, &this, "charAt")?;
        let index = to_integer(interp, &arg(args, 0))?;
        if index < 0.0 || index >= units.len() as f64 {
            return Ok(Value::from(""));
        }
        Ok(Value::from(String::from_utf16_lossy(&units[index as usize..index as usize + 1])))
    }

    /// String.prototype.charCodeAt(index)
    pub fn char_code_at(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let units = this_units(interp, &this, "charCodeAt")?;
        let index = to_integer(interp, &arg(args, 0))?;
        if index < 0.0 || index >= units.len() as f64 {
            return Ok(Value::Number(f64::NAN));
        }
        Ok(Value::Number(units[index as usize] as f64))
    }

    /// String.prototype.at(index)
    pub fn at(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let units = this_units(interp, &this, "at")?;
        let index = to_integer(interp, &arg(args, 0))?;
        let index = if index < 0.0 { units.len() as f64 + index } else { index };
        if index < 0.0 || index >= units.len() as f64 {
            return Ok(Value::Undefined);
        }
        Ok(Value::from(String::from_utf16_lossy(&units[index as usize..index as usize + 1])))
    }

    /// String.prototype.indexOf(search, position)
    pub fn index_of(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let units = this_units(interp, &this, "indexOf")?;
        let needle = arg_units(interp, args, 0)?;
        let from = relative_index(interp, &arg(args, 1), units.len(), 0)?;
        let found = find_units(&units, &needle, from);
        Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
    }

    /// String.prototype.lastIndexOf(search)
    pub fn last_index_of(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let units = this_units(interp, &this, "lastIndexOf")?;
        let needle = arg_units(interp, args, 0)?;
        let found = if needle.len() > units.len() {
            None
        } else {
            (0..=units.len() - needle.len())
                .rev()
                .find(|&i| units[i..i + needle.len()] == needle[..])
        };
        Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
    }

    /// String.prototype.includes(search)
    pub fn includes(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let units = this_units(interp, &this, "includes")?;
        reject_regexp(interp, args, "includes")?;
        let needle = arg_units(interp, args, 0)?;
        Ok(Value::Boolean(find_units(&units, &needle, 0).is_some()))
    }

    /// String.prototype.startsWith(search, position)
    pub fn starts_with(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let units = this_units(interp, &this, "startsWith")?;
        reject_regexp(interp, args, "startsWith")?;
        let needle = arg_units(interp, args, 0)?;
        let start = relative_index(interp, &arg(args, 1), units.len(), 0)?;
        Ok(Value::Boolean(units[start..].starts_with(&needle)))
    }

    /// String.prototype.endsWith(search, length)
    pub fn ends_with(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let units = this_units(interp, &this, "endsWith")?;
        reject_regexp(interp, args, "endsWith")?;
        let needle = arg_units(interp, args, 0)?;
        let end = relative_index(interp, &arg(args, 1), units.len(), units.len())?;
        Ok(Value::Boolean(units[..end].ends_with(&needle)))
    }

    /// String.prototype.slice(start, end)
    pub fn slice(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let units = this_units(interp, &this, "slice")?;
        let start = relative_index(interp, &arg(args, 0), units.len(), 0)?;
        let end = relative_index(interp, &arg(args, 1), units.len(), units.len())?;
        if start >= end {
            return Ok(Value::from(""));
        }
        Ok(Value::from(String::from_utf16_lossy(&units[start..end])))
    }

    /// String.prototype.substring(start, end)
    pub fn substring(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let units = this_units(interp, &this, "substring")?;
        let len = units.len() as f64;
        let start = to_integer(interp, &arg(args, 0))?.clamp(0.0, len) as usize;
        let end = match args.get(1) {
            None | Some(Value::Undefined) => units.len(),
            Some(value) => to_integer(interp, value)?.clamp(0.0, len) as usize,
        };
        let (from, to) = if start <= end { (start, end) } else { (end, start) };
        Ok(Value::from(String::from_utf16_lossy(&units[from..to])))
    }

    /// String.prototype.toUpperCase()
    pub fn to_upper_case(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        Ok(Value::from(this_string(interp, &this, "toUpperCase")?.to_uppercase()))
    }

    /// String.prototype.toLowerCase()
    pub fn to_lower_case(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        Ok(Value::from(this_string(interp, &this, "toLowerCase")?.to_lowercase()))
    }

    /// String.prototype.trim()
    pub fn trim(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        Ok(Value::from(this_string(interp, &this, "trim")?.trim_matches(is_js_whitespace)))
    }

    /// String.prototype.trimStart()
    pub fn trim_start(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        Ok(Value::from(
            this_string(interp, &this, "trimStart")?.trim_start_matches(is_js_whitespace),
        ))
    }

    /// String.prototype.trimEnd()
    pub fn trim_end(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        Ok(Value::from(this_string(interp, &this, "trimEnd")?.trim_end_matches(is_js_whitespace)))
    }

    /// String.prototype.padStart(targetLength, padString)
    pub fn pad_start(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        pad(interp, &this, args, "padStart", true)
    }

    /// String.prototype.padEnd(targetLength, padString)
    pub fn pad_end(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        pad(interp, &this, args, "padEnd", false)
    }

    /// String.prototype.repeat(count)
    pub fn repeat(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let s = this_string(interp, &this, "repeat")?;
        let count = to_integer(interp, &arg(args, 0))?;
        if count < 0.0 || count.is_infinite() {
            let message = format!("Invalid count value: {}", interp.to_string(&arg(args, 0))?);
            return Err(interp.throw_error(core_types::ErrorKind::RangeError, message));
        }
        if utf16_len(&s) as f64 * count > MAX_STRING_LENGTH as f64 {
            return Err(interp.invalid_string_length());
        }
        Ok(Value::from(s.repeat(count as usize)))
    }

    /// String.prototype.split(separator, limit)
    pub fn split(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let s = this_string(interp, &this, "split")?;
        let limit = match args.get(1) {
            None | Some(Value::Undefined) => usize::MAX,
            Some(value) => interpreter::value::to_uint32(interp.to_number(value)?) as usize,
        };

        let parts: Vec<String> = match args.first() {
            None | Some(Value::Undefined) => vec![s.to_string()],
            Some(Value::Object(object)) if object.is_regexp() => {
                let (regex, _) = regexp::compiled(object).ok_or_else(|| interp.type_error("Invalid regexp"))?;
                if s.is_empty() {
                    if regex.is_match("") {
                        Vec::new()
                    } else {
                        vec![String::new()]
                    }
                } else {
                    regex.split(&s).map(str::to_string).collect()
                }
            }
            Some(separator) => {
                let separator = interp.to_string(separator)?;
                if separator.is_empty() {
                    s.chars().map(|c| c.to_string()).collect()
                } else {
                    s.split(&*separator).map(str::to_string).collect()
                }
            }
        };
        let parts = parts.into_iter().take(limit).map(Value::from).collect();
        Ok(Value::Object(interp.realm.new_array(parts)))
    }

    /// String.prototype.replace(pattern, replacement)
    pub fn replace(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let s = this_string(interp, &this, "replace")?;
        let matches = match args.first() {
            Some(Value::Object(object)) if object.is_regexp() => {
                let (regex, flags) = regexp::compiled(object).ok_or_else(|| interp.type_error("Invalid regexp"))?;
                let global = flags.contains('g');
                if global {
                    object.set("lastIndex", Value::Number(0.0));
                }
                regexp::find_matches(&regex, &s, if global { usize::MAX } else { 1 })
            }
            _ => {
                let needle = interp.to_string(&arg(args, 0))?;
                literal_matches(&s, &needle, 1)
            }
        };
        substitute(interp, &s, matches, &arg(args, 1))
    }

    /// String.prototype.replaceAll(pattern, replacement)
    pub fn replace_all(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let s = this_string(interp, &this, "replaceAll")?;
        let matches = match args.first() {
            Some(Value::Object(object)) if object.is_regexp() => {
                let (regex, flags) = regexp::compiled(object).ok_or_else(|| interp.type_error("Invalid regexp"))?;
                if !flags.contains('g') {
                    return Err(interp.type_error("replaceAll must be called with a global RegExp"));
                }
                regexp::find_matches(&regex, &s, usize::MAX)
            }
            _ => {
                let needle = interp.to_string(&arg(args, 0))?;
                literal_matches(&s, &needle, usize::MAX)
            }
        };
        substitute(interp, &s, matches, &arg(args, 1))
    }

    /// String.prototype.match(regexp)
    pub fn match_regexp(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let s = this_string(interp, &this, "match")?;
        let pattern = match args.first() {
            Some(Value::Object(object)) if object.is_regexp() => object.clone(),
            Some(value) => {
                let source = interp.to_string(value)?;
                interp
                    .realm
                    .new_regexp(&regex::escape(&source), "")
                    .map_err(|e| interp.throw_js_error(&e))?
            }
            None => interp
                .realm
                .new_regexp("(?:)", "")
                .map_err(|e| interp.throw_js_error(&e))?,
        };
        let (regex, flags) = regexp::compiled(&pattern).ok_or_else(|| interp.type_error("Invalid regexp"))?;
        if !flags.contains('g') {
            return regexp::RegExpPrototype::exec(interp, Value::Object(pattern), &[Value::String(s)]);
        }
        pattern.set("lastIndex", Value::Number(0.0));
        let found: Vec<Value> = regexp::find_matches(&regex, &s, usize::MAX)
            .into_iter()
            .map(|m| Value::from(m.text(&s)))
            .collect();
        if found.is_empty() {
            return Ok(Value::Null);
        }
        Ok(Value::Object(interp.realm.new_array(found)))
    }

    /// String.prototype.concat(...values)
    pub fn concat(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let mut parts = vec![this_string(interp, &this, "concat")?];
        for value in args {
            parts.push(interp.to_string(value)?);
        }
        let parts: Vec<&str> = parts.iter().map(|part| &**part).collect();
        Ok(Value::from(interp.concat_strings(&parts)?))
    }

    /// String.prototype.localeCompare(other)
    pub fn locale_compare(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let s = this_string(interp, &this, "localeCompare")?;
        let other = interp.to_string(&arg(args, 0))?;
        Ok(Value::Number(match s.cmp(&other) {
            std::cmp::Ordering::Less => -1.0,
            std::cmp::Ordering::Equal => 0.0,
            std::cmp::Ordering::Greater => 1.0,
        }))
    }

    /// String.prototype.valueOf() / toString()
    pub fn value_of(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        match this {
            Value::String(_) => Ok(this),
            _ => Err(interp.type_error("String.prototype.valueOf requires that 'this' be a String")),
        }
    }
}

fn this_string(interp: &mut Interpreter, this: &Value, method: &str) -> Result<Rc<str>, Control> {
    if this.is_nullish() {
        return Err(interp.type_error(format!("String.prototype.{} called on null or undefined", method)));
    }
    interp.to_string(this)
}

fn this_units(interp: &mut Interpreter, this: &Value, method: &str) -> Result<Vec<u16>, Control> {
    Ok(this_string(interp, this, method)?.encode_utf16().collect())
}

fn arg_units(interp: &mut Interpreter, args: &[Value], index: usize) -> Result<Vec<u16>, Control> {
    Ok(interp.to_string(&arg(args, index))?.encode_utf16().collect())
}

fn reject_regexp(interp: &Interpreter, args: &[Value], method: &str) -> Result<(), Control> {
    match args.first() {
        Some(Value::Object(object)) if object.is_regexp() => Err(interp.type_error(format!(
            "First argument to String.prototype.{} must not be a regular expression",
            method
        ))),
        _ => Ok(()),
    }
}

fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

fn pad(interp: &mut Interpreter, this: &Value, args: &[Value], method: &str, at_start: bool) -> JsResult {
    let s = this_string(interp, this, method)?;
    let target = to_integer(interp, &arg(args, 0))?.max(0.0);
    let filler: Vec<u16> = match args.get(1) {
        None | Some(Value::Undefined) => vec![b' ' as u16],
        Some(value) => interp.to_string(value)?.encode_utf16().collect(),
    };
    let len = utf16_len(&s);
    if target <= len as f64 || filler.is_empty() {
        return Ok(Value::String(s));
    }
    if target > MAX_STRING_LENGTH as f64 {
        return Err(interp.invalid_string_length());
    }
    let target = target as usize;
    let padding: Vec<u16> = filler.iter().copied().cycle().take(target - len).collect();
    let padding = String::from_utf16_lossy(&padding);
    Ok(Value::from(if at_start {
        format!("{}{}", padding, s)
    } else {
        format!("{}{}", s, padding)
    }))
}

fn literal_matches(s: &str, needle: &str, limit: usize) -> Vec<Match> {
    let mut matches = Vec::new();
    if needle.is_empty() {
        let positions = s.char_indices().map(|(i, _)| i).chain(std::iter::once(s.len()));
        for start in positions.take(limit) {
            matches.push(Match::literal(start, start));
        }
        return matches;
    }
    for (start, found) in s.match_indices(needle).take(limit) {
        matches.push(Match::literal(start, start + found.len()));
    }
    matches
}

/// Build the result of `replace`/`replaceAll` from the located matches
fn substitute(interp: &mut Interpreter, s: &str, matches: Vec<Match>, replacement: &Value) -> JsResult {
    let template = if replacement.is_callable() {
        None
    } else {
        Some(interp.to_string(replacement)?)
    };

    let mut out = String::with_capacity(s.len());
    let mut cursor = 0;
    for m in &matches {
        out.push_str(&s[cursor..m.start]);
        match &template {
            Some(template) => out.push_str(&expand_template(template, s, m)),
            None => {
                let mut call_args = vec![Value::from(m.text(s))];
                call_args.extend(m.groups.iter().map(|group| match group {
                    Some((start, end)) => Value::from(&s[*start..*end]),
                    None => Value::Undefined,
                }));
                call_args.push(Value::Number(utf16_len(&s[..m.start]) as f64));
                call_args.push(Value::from(s));
                let result = interp.call(replacement, Value::Undefined, &call_args)?;
                out.push_str(&interp.to_string(&result)?);
            }
        }
        cursor = m.end;
        if exceeds_string_limit(&[&out]) {
            return Err(interp.invalid_string_length());
        }
    }
    out.push_str(&s[cursor..]);
    Ok(Value::from(out))
}

/// Expand `$&`, `$1`..`$99`, `` $` ``, `$'` and `$$` in a replacement string
fn expand_template(template: &str, s: &str, m: &Match) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('&') => {
                chars.next();
                out.push_str(m.text(s));
            }
            Some('`') => {
                chars.next();
                out.push_str(&s[..m.start]);
            }
            Some('\'') => {
                chars.next();
                out.push_str(&s[m.end..]);
            }
            Some(d) if d.is_ascii_digit() => {
                chars.next();
                let mut index = d.to_digit(10).unwrap_or(0) as usize;
                if let Some(next) = chars.peek().and_then(|c| c.to_digit(10)) {
                    let two_digit = index * 10 + next as usize;
                    if two_digit >= 1 && two_digit <= m.groups.len() {
                        chars.next();
                        index = two_digit;
                    }
                }
                match m.groups.get(index.wrapping_sub(1)) {
                    Some(Some((start, end))) if index >= 1 => out.push_str(&s[*start..*end]),
                    Some(None) if index >= 1 => {}
                    _ => {
                        out.push('$');
                        out.push_str(&index.to_string());
                    }
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use interpreter::Interpreter;

    fn eval(source: &str) -> String {
        let mut interp = Interpreter::new();
        crate::install(&mut interp);
        let value = interp.eval_source(source).unwrap();
        crate::display(&value)
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(eval("'  Hello '.trim().toUpperCase()"), "HELLO");
        assert_eq!(eval("'  x'.trimStart() + '|'"), "x|");
    }

    #[test]
    fn test_search() {
        assert_eq!(eval("'hello world'.indexOf('o')"), "4");
        assert_eq!(eval("'hello world'.indexOf('o', 5)"), "7");
        assert_eq!(eval("'hello world'.lastIndexOf('o')"), "7");
        assert_eq!(eval("'abc'.includes('bc') && 'abc'.startsWith('ab') && 'abc'.endsWith('c')"), "true");
    }

    #[test]
    fn test_slicing() {
        assert_eq!(eval("'abcdef'.slice(-3, -1)"), "de");
        assert_eq!(eval("'abcdef'.substring(4, 1)"), "bcd");
        assert_eq!(eval("'abc'.charAt(1) + 'abc'.charCodeAt(0)"), "b97");
        assert_eq!(eval("'abc'.at(-1)"), "c");
    }

    #[test]
    fn test_padding_and_repeat() {
        assert_eq!(eval("'5'.padStart(3, '0')"), "005");
        assert_eq!(eval("'ab'.padEnd(5, 'xy')"), "abxyx");
        assert_eq!(eval("'ab'.repeat(3)"), "ababab");
    }

    #[test]
    fn test_split() {
        assert_eq!(eval("'a,b,,c'.split(',').length"), "4");
        assert_eq!(eval("'abc'.split('').join('-')"), "a-b-c");
        assert_eq!(eval("'a1b22c'.split(/\\d+/).join('|')"), "a|b|c");
        assert_eq!(eval("'a b c'.split(' ', 2).join('|')"), "a|b");
    }

    #[test]
    fn test_replace() {
        assert_eq!(eval("'aaa'.replace('a', 'b')"), "baa");
        assert_eq!(eval("'aaa'.replaceAll('a', 'b')"), "bbb");
        assert_eq!(eval("'john smith'.replace(/(\\w+) (\\w+)/, '$2, $1')"), "smith, john");
        assert_eq!(eval("'a1b2'.replace(/\\d/g, d => d * 2)"), "a2b4");
        assert_eq!(eval("'x'.replace('x', '[$&]')"), "[x]");
    }

    #[test]
    fn test_match() {
        assert_eq!(eval("'a1b22'.match(/\\d+/g).join(',')"), "1,22");
        assert_eq!(eval("'abc'.match(/z/)"), "null");
        assert_eq!(eval("'abc'.match(/b(c)/)[1]"), "c");
    }

    #[test]
    fn test_utf16_length() {
        assert_eq!(eval("'😀'.length"), "2");
        assert_eq!(eval("'a😀b'.indexOf('b')"), "3");
    }
}
