//! Scans a string literal for `{expr}` / `{expr:spec}` interpolation
//! placeholders, honoring `{{`/`}}` as escaped literal braces.

#[derive(Debug, Clone)]
pub struct Placeholder {
    /// The raw source text of the expression inside the braces, not yet
    /// parsed; the caller re-lexes it through the normal expression path.
    pub source: String,
    pub format_spec: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScanResult {
    /// The original string with every placeholder replaced by `{}`
    /// (retaining any `:spec` suffix).
    pub format_string: String,
    pub placeholders: Vec<Placeholder>,
}

#[must_use]
pub fn scan(input: &str) -> ScanResult {
    let mut format_string = String::with_capacity(input.len());
    let mut placeholders = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut index = 0;
    while index < chars.len() {
        let ch = chars[index];
        if ch == '{' && chars.get(index + 1) == Some(&'{') {
            format_string.push('{');
            index += 2;
            continue;
        }
        if ch == '}' && chars.get(index + 1) == Some(&'}') {
            format_string.push('}');
            index += 2;
            continue;
        }
        if ch == '{' {
            let close = chars[index + 1..].iter().position(|c| *c == '}').map(|pos| index + 1 + pos);
            if let Some(close) = close {
                let inner: String = chars[index + 1..close].iter().collect();
                let (source, format_spec) = match inner.split_once(':') {
                    Some((expr, spec)) => (expr.to_owned(), Some(spec.to_owned())),
                    None => (inner, None),
                };
                format_string.push('{');
                if let Some(spec) = &format_spec {
                    format_string.push(':');
                    format_string.push_str(spec);
                }
                format_string.push('}');
                placeholders.push(Placeholder { source, format_spec });
                index = close + 1;
                continue;
            }
        }
        format_string.push(ch);
        index += 1;
    }
    ScanResult { format_string, placeholders }
}
