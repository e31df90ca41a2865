//! 从 GLSL 源码中提取 `layout(binding = N)` 声明
//!
//! 只关心 set 0：没有显式写 `set` 的声明视为 set 0。
//! 名字取声明中 `{` 或 `;` 之前的最后一个标识符，因此 block 取 block 名，
//! 普通 uniform 取变量名，数组会去掉 `[...]` 部分。

use std::collections::BTreeMap;

/// 扫描源码，得到 set 0 中 slot -> 名字的映射
pub fn scan_set0_bindings(source: &str) -> BTreeMap<u32, String> {
    let text = strip_comments(source);
    let mut table = BTreeMap::new();

    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find("layout") {
        let start = cursor + offset;
        cursor = start + "layout".len();

        let prev_is_ident = text[..start].chars().next_back().is_some_and(is_ident_char);
        if prev_is_ident {
            continue;
        }
        let rest = &text[cursor..];
        let Some(open) = rest.find(|c: char| !c.is_whitespace()).filter(|i| rest[*i..].starts_with('(')) else {
            continue;
        };
        let Some(close) = rest[open..].find(')') else {
            break;
        };
        let qualifiers = &rest[open + 1..open + close];
        cursor += open + close + 1;

        let (binding, set) = parse_qualifiers(qualifiers);
        let Some(binding) = binding else {
            continue;
        };
        if set.unwrap_or(0) != 0 {
            continue;
        }

        let declaration = &text[cursor..];
        let end = declaration.find(['{', ';']).unwrap_or(declaration.len());
        let Some(name) = declaration_name(&declaration[..end]) else {
            log::warn!("binding = {} 的声明缺少名字，忽略", binding);
            continue;
        };

        if let Some(existing) = table.get(&binding) {
            if existing != &name {
                log::warn!("binding = {} 重复声明: {} 与 {}，保留前者", binding, existing, name);
            }
            continue;
        }
        table.insert(binding, name);
    }

    table
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// 解析 `binding = N`、`set = N`，其余限定符（std140、push_constant 等）忽略
fn parse_qualifiers(qualifiers: &str) -> (Option<u32>, Option<u32>) {
    let mut binding = None;
    let mut set = None;
    for item in qualifiers.split(',') {
        let Some((key, value)) = item.split_once('=') else {
            continue;
        };
        let value = value.trim().parse::<u32>().ok();
        match key.trim() {
            "binding" => binding = value,
            "set" => set = value,
            _ => {}
        }
    }
    (binding, set)
}

fn declaration_name(declaration: &str) -> Option<String> {
    let mut without_arrays = String::with_capacity(declaration.len());
    let mut depth = 0usize;
    for c in declaration.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => without_arrays.push(c),
            _ => {}
        }
    }

    without_arrays
        .split(|c: char| !is_ident_char(c))
        .filter(|token| !token.is_empty())
        .next_back()
        .map(str::to_string)
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        prev = c;
                    }
                    out.push(' ');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}
