//! CSS Parser using cssparser
//!
//! Provides:
//! - Stylesheet rules (selector text plus declarations)
//! - Declaration blocks, shared by rules and `style` attributes
//! - Color parsing (hex, rgb, rgba, named colors)
//! - Length parsing (px, %, em, mm, auto)
//! - Property application onto [`CssStyles`]

use cssparser::{Parser, ParserInput, ToCss, Token as CssToken};
use viewtree_dom::{
    BorderStyle, Clear, Color, CssStyles, Display, Edges, Float, FontStyle, FontWeight, Length,
    Overflow, Position, TextAlign,
};

/// One `name: value` pair; names are lowercased, values keep their spacing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

/// CSS Rule for stylesheet parsing
#[derive(Clone, Debug)]
pub struct CssRule {
    pub selector: String,
    pub declarations: Vec<Declaration>,
}

/// Named color lookup table
fn get_named_color(name: &str) -> Option<Color> {
    match name {
        "black" => Some(Color::new(0x00, 0x00, 0x00, 0xff)),
        "white" => Some(Color::new(0xff, 0xff, 0xff, 0xff)),
        "red" => Some(Color::new(0xff, 0x00, 0x00, 0xff)),
        "green" => Some(Color::new(0x00, 0x80, 0x00, 0xff)),
        "lime" => Some(Color::new(0x00, 0xff, 0x00, 0xff)),
        "blue" => Some(Color::new(0x00, 0x00, 0xff, 0xff)),
        "yellow" => Some(Color::new(0xff, 0xff, 0x00, 0xff)),
        "cyan" | "aqua" => Some(Color::new(0x00, 0xff, 0xff, 0xff)),
        "magenta" | "fuchsia" => Some(Color::new(0xff, 0x00, 0xff, 0xff)),
        "gray" | "grey" => Some(Color::new(0x80, 0x80, 0x80, 0xff)),
        "transparent" => Some(Color::TRANSPARENT),
        "orange" => Some(Color::new(0xff, 0xa5, 0x00, 0xff)),
        "purple" => Some(Color::new(0x80, 0x00, 0x80, 0xff)),
        "navy" => Some(Color::new(0x00, 0x00, 0x80, 0xff)),
        "maroon" => Some(Color::new(0x80, 0x00, 0x00, 0xff)),
        "olive" => Some(Color::new(0x80, 0x80, 0x00, 0xff)),
        "teal" => Some(Color::new(0x00, 0x80, 0x80, 0xff)),
        "silver" => Some(Color::new(0xc0, 0xc0, 0xc0, 0xff)),
        _ => None,
    }
}

/// Parse a CSS color value; unknown values are transparent
pub fn parse_color(value: &str) -> Color {
    let value = value.trim().to_lowercase();

    if let Some(color) = get_named_color(&value) {
        return color;
    }

    if let Some(hex) = value.strip_prefix('#') {
        return Color::from_hex(hex).unwrap_or(Color::TRANSPARENT);
    }

    if value.starts_with("rgb") {
        let numbers: Vec<&str> = value
            .trim_start_matches("rgba")
            .trim_start_matches("rgb")
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(|c| c == ',' || c == ' ' || c == '/')
            .filter(|s| !s.is_empty())
            .collect();

        if numbers.len() >= 3 {
            let channel = |s: &str| s.trim().parse::<f32>().unwrap_or(0.0).clamp(0.0, 255.0) as u8;
            let a = match numbers.get(3) {
                Some(alpha) => (alpha.trim().parse::<f32>().unwrap_or(1.0).clamp(0.0, 1.0) * 255.0) as u8,
                None => 255,
            };
            return Color::new(channel(numbers[0]), channel(numbers[1]), channel(numbers[2]), a);
        }
    }

    Color::TRANSPARENT
}

/// Parse a CSS length value
pub fn parse_length(value: &str, container_size: f32) -> Length {
    let value = value.trim().to_lowercase();

    if value == "auto" {
        return Length::AUTO;
    }

    if let Some(num) = value.strip_suffix('%') {
        if let Ok(num) = num.parse::<f32>() {
            return Length::px(num / 100.0 * container_size);
        }
    }

    // Pixels (default unit)
    if let Ok(num) = value.trim_end_matches("px").parse::<f32>() {
        return Length::px(num);
    }

    // em units (assume 16px base)
    if let Some(num) = value.strip_suffix("em") {
        if let Ok(num) = num.parse::<f32>() {
            return Length::px(num * 16.0);
        }
    }

    // mm units (1mm = 3.7795275591 pixels at 96 DPI)
    if let Some(num) = value.strip_suffix("mm") {
        if let Ok(num) = num.parse::<f32>() {
            return Length::px(num * 3.7795275591);
        }
    }

    Length::AUTO
}

/// Parse a `style` attribute into styles starting from the initial values
pub fn parse_inline_style(style_str: &str) -> CssStyles {
    let mut styles = CssStyles::default();
    apply_declarations(&mut styles, &parse_declarations(style_str));
    styles
}

/// Apply declarations in order; later ones win
pub fn apply_declarations(styles: &mut CssStyles, declarations: &[Declaration]) {
    for declaration in declarations {
        apply_property(styles, &declaration.name, &declaration.value);
    }
}

/// Apply a CSS property to styles. Unknown properties are ignored.
pub fn apply_property(styles: &mut CssStyles, prop: &str, val: &str) {
    let val_lower = val.trim().to_lowercase();

    match prop {
        "position" => {
            styles.position = match val_lower.as_str() {
                "relative" => Position::Relative,
                "absolute" => Position::Absolute,
                "fixed" => Position::Fixed,
                _ => Position::Static,
            };
        }

        "display" => {
            styles.display = match val_lower.as_str() {
                "none" => Display::None,
                "inline" => Display::Inline,
                "inline-block" => Display::InlineBlock,
                "table" => Display::Table,
                "table-row" => Display::TableRow,
                "table-cell" => Display::TableCell,
                _ => Display::Block,
            };
        }

        "visibility" => styles.visibility = val_lower != "hidden",

        "overflow" => {
            styles.overflow = if val_lower == "hidden" {
                Overflow::Hidden
            } else {
                Overflow::Visible
            };
        }

        "background-color" | "background" => {
            let color = parse_color(val);
            styles.background_color = color;
            styles.has_background = color.a > 0;
        }

        "color" => styles.color = parse_color(val),

        "width" => styles.width = parse_length(val, 0.0),
        "height" => styles.height = parse_length(val, 0.0),
        "top" => styles.top = parse_length(val, 0.0),
        "right" => styles.right = parse_length(val, 0.0),
        "bottom" => styles.bottom = parse_length(val, 0.0),
        "left" => styles.left = parse_length(val, 0.0),

        "z-index" => {
            if let Ok(z) = val.trim().parse::<i32>() {
                styles.z_index = z;
            }
        }

        "margin" => styles.margin = parse_edges_shorthand(val),
        "margin-top" => styles.margin.top = parse_length(val, 0.0).value,
        "margin-right" => styles.margin.right = parse_length(val, 0.0).value,
        "margin-bottom" => styles.margin.bottom = parse_length(val, 0.0).value,
        "margin-left" => styles.margin.left = parse_length(val, 0.0).value,

        "padding" => styles.padding = parse_edges_shorthand(val),
        "padding-top" => styles.padding.top = parse_length(val, 0.0).value,
        "padding-right" => styles.padding.right = parse_length(val, 0.0).value,
        "padding-bottom" => styles.padding.bottom = parse_length(val, 0.0).value,
        "padding-left" => styles.padding.left = parse_length(val, 0.0).value,

        "float" => {
            styles.float = match val_lower.as_str() {
                "left" => Float::Left,
                "right" => Float::Right,
                _ => Float::None,
            };
        }

        "clear" => {
            styles.clear = match val_lower.as_str() {
                "left" => Clear::Left,
                "right" => Clear::Right,
                "both" => Clear::Both,
                _ => Clear::None,
            };
        }

        "min-width" | "max-width" | "min-height" | "max-height" => {
            let len = parse_length(val, 0.0);
            if !len.is_auto {
                match prop {
                    "min-width" => styles.min_width = len,
                    "max-width" => styles.max_width = len,
                    "min-height" => styles.min_height = len,
                    _ => styles.max_height = len,
                }
            }
        }

        "border" => parse_border_shorthand(val, styles),
        "border-width" => styles.border_width = parse_edges_shorthand(val),
        "border-style" => styles.border_style = parse_border_style(&val_lower),
        "border-color" => styles.border_color = parse_color(val),

        "line-height" => {
            if val_lower == "normal" {
                styles.line_height_normal = true;
            } else {
                let len = parse_length(val, 0.0);
                if !len.is_auto {
                    styles.line_height = len.value;
                    styles.line_height_normal = false;
                }
            }
        }

        "font-size" => {
            let len = parse_length(val, 0.0);
            if !len.is_auto {
                styles.font_size = len.value;
            }
        }

        "font-weight" => {
            styles.font_weight = match val_lower.as_str() {
                "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                _ => FontWeight::Normal,
            };
        }

        "font-style" => {
            styles.font_style = match val_lower.as_str() {
                "italic" | "oblique" => FontStyle::Italic,
                _ => FontStyle::Normal,
            };
        }

        "text-align" => {
            styles.text_align = match val_lower.as_str() {
                "left" => TextAlign::Left,
                "right" => TextAlign::Right,
                "center" => TextAlign::Center,
                "justify" => TextAlign::Justify,
                _ => TextAlign::Start,
            };
        }

        _ => log::trace!("ignoring unsupported property {prop}"),
    }
}

/// Parse margin/padding shorthand (1-4 values) into top, right, bottom, left
fn parse_edges_shorthand(val: &str) -> Edges {
    let values: Vec<f32> = val
        .split_whitespace()
        .map(|p| parse_length(p, 0.0).value)
        .collect();

    match values.as_slice() {
        [all] => Edges::uniform(*all),
        [vertical, horizontal] => Edges {
            top: *vertical,
            right: *horizontal,
            bottom: *vertical,
            left: *horizontal,
        },
        [top, horizontal, bottom] => Edges {
            top: *top,
            right: *horizontal,
            bottom: *bottom,
            left: *horizontal,
        },
        [top, right, bottom, left] => Edges {
            top: *top,
            right: *right,
            bottom: *bottom,
            left: *left,
        },
        _ => Edges::default(),
    }
}

/// Parse border style value
fn parse_border_style(val: &str) -> BorderStyle {
    match val.trim() {
        "solid" => BorderStyle::Solid,
        "dotted" => BorderStyle::Dotted,
        "dashed" => BorderStyle::Dashed,
        _ => BorderStyle::None,
    }
}

/// Parse border shorthand (e.g., "1px solid black")
fn parse_border_shorthand(val: &str, styles: &mut CssStyles) {
    for part in val.split_whitespace() {
        let part_lower = part.to_lowercase();

        if part.chars().next().map_or(false, |c| c.is_ascii_digit()) {
            styles.border_width = Edges::uniform(parse_length(part, 0.0).value);
        } else if matches!(part_lower.as_str(), "solid" | "dotted" | "dashed" | "none") {
            styles.border_style = parse_border_style(&part_lower);
        } else {
            styles.border_color = parse_color(part);
        }
    }
}

/// Serialize `token` into `out`, including the content of any block it opens
fn push_token<'i>(parser: &mut Parser<'i, '_>, token: &CssToken<'i>, out: &mut String) {
    out.push_str(&token.to_css_string());
    let close = match token {
        CssToken::Function(_) | CssToken::ParenthesisBlock => ')',
        CssToken::SquareBracketBlock => ']',
        CssToken::CurlyBracketBlock => '}',
        _ => return,
    };
    let _ = parser.parse_nested_block(|nested| {
        while let Ok(inner) = nested.next_including_whitespace() {
            let inner = inner.clone();
            push_token(nested, &inner, out);
        }
        Ok::<_, cssparser::ParseError<'i, ()>>(())
    });
    out.push(close);
}

/// Skip the rest of a malformed declaration
fn skip_declaration(parser: &mut Parser) {
    while let Ok(token) = parser.next() {
        if matches!(token, CssToken::Semicolon) {
            break;
        }
    }
}

/// Parse `name: value;` pairs until the parser is exhausted
fn parse_declaration_block(parser: &mut Parser) -> Vec<Declaration> {
    let mut declarations = Vec::new();

    loop {
        let name = match parser.next() {
            Ok(CssToken::Ident(name)) => name.to_ascii_lowercase(),
            Ok(CssToken::Semicolon) => continue,
            Ok(_) => {
                skip_declaration(parser);
                continue;
            }
            Err(_) => break,
        };

        match parser.next() {
            Ok(CssToken::Colon) => {}
            Ok(_) => {
                skip_declaration(parser);
                continue;
            }
            Err(_) => break,
        }

        let mut value = String::new();
        loop {
            match parser.next_including_whitespace() {
                Ok(CssToken::Semicolon) | Err(_) => break,
                Ok(token) => {
                    let token = token.clone();
                    push_token(parser, &token, &mut value);
                }
            }
        }

        let value = value.trim();
        let value = value.strip_suffix("!important").map_or(value, str::trim_end);
        if !value.is_empty() {
            declarations.push(Declaration {
                name,
                value: value.to_string(),
            });
        }
    }

    declarations
}

/// Parse the declarations of a `style` attribute or rule body
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parse_declaration_block(&mut parser)
}

/// Parse a CSS stylesheet into rules. At-rules are skipped with their blocks.
pub fn parse_stylesheet(css: &str) -> Vec<CssRule> {
    let mut rules = Vec::new();
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);

    let mut selector = String::new();
    let mut in_at_rule = false;

    loop {
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            CssToken::AtKeyword(ref name) => {
                log::debug!("skipping @{} rule", &**name);
                in_at_rule = true;
            }
            CssToken::Semicolon if in_at_rule => {
                in_at_rule = false;
                selector.clear();
            }
            CssToken::CurlyBracketBlock if in_at_rule => {
                // Not entering the block makes the next read skip it
                in_at_rule = false;
                selector.clear();
            }
            CssToken::CurlyBracketBlock => {
                let declarations = parser
                    .parse_nested_block(|nested| {
                        Ok::<_, cssparser::ParseError<'_, ()>>(parse_declaration_block(nested))
                    })
                    .unwrap_or_default();
                rules.push(CssRule {
                    selector: selector.trim().to_string(),
                    declarations,
                });
                selector.clear();
            }
            _ if in_at_rule => {}
            CssToken::CDO | CssToken::CDC => {}
            other => push_token(&mut parser, &other, &mut selector),
        }
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_named() {
        assert_eq!(parse_color("black"), Color::new(0, 0, 0, 255));
        assert_eq!(parse_color("White"), Color::new(255, 255, 255, 255));
        assert_eq!(parse_color("red"), Color::new(255, 0, 0, 255));
        assert_eq!(parse_color("transparent"), Color::TRANSPARENT);
    }

    #[test]
    fn test_parse_color_hex() {
        assert_eq!(parse_color("#fff"), Color::new(255, 255, 255, 255));
        assert_eq!(parse_color("#ff0000"), Color::new(255, 0, 0, 255));
        assert_eq!(parse_color("#00ff0080"), Color::new(0, 255, 0, 128));
        assert_eq!(parse_color("#zz"), Color::TRANSPARENT);
    }

    #[test]
    fn test_parse_color_rgb() {
        assert_eq!(parse_color("rgb(10, 20, 30)"), Color::new(10, 20, 30, 255));
        assert_eq!(parse_color("rgba(10,20,30,0)"), Color::new(10, 20, 30, 0));
        assert_eq!(parse_color("bogus"), Color::TRANSPARENT);
    }

    #[test]
    fn test_parse_length() {
        let len = parse_length("100px", 0.0);
        assert_eq!(len.value, 100.0);
        assert!(!len.is_auto);

        assert!(parse_length("auto", 0.0).is_auto);
        assert_eq!(parse_length("50", 0.0).value, 50.0);
        assert_eq!(parse_length("2em", 0.0).value, 32.0);
        assert_eq!(parse_length("50%", 200.0).value, 100.0);
    }

    #[test]
    fn test_parse_inline_style() {
        let styles = parse_inline_style("width: 100px; height: 50px; background-color: red;");

        assert_eq!(styles.width.value, 100.0);
        assert!(!styles.width.is_auto);
        assert_eq!(styles.height.value, 50.0);
        assert_eq!(styles.background_color, Color::new(255, 0, 0, 255));
        assert!(styles.has_background);
    }

    #[test]
    fn test_parse_positioning() {
        let styles = parse_inline_style("position: absolute; top: 10px; left: 20px;");

        assert_eq!(styles.position, Position::Absolute);
        assert_eq!(styles.top.value, 10.0);
        assert!(!styles.top.is_auto);
        assert_eq!(styles.left.value, 20.0);
    }

    #[test]
    fn test_parse_edges_shorthand() {
        assert_eq!(parse_edges_shorthand("10px"), Edges::uniform(10.0));

        let e = parse_edges_shorthand("10px 20px");
        assert_eq!((e.top, e.right, e.bottom, e.left), (10.0, 20.0, 10.0, 20.0));

        let e = parse_edges_shorthand("10px 20px 30px 40px");
        assert_eq!((e.top, e.right, e.bottom, e.left), (10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn test_declaration_values_keep_spacing() {
        let declarations = parse_declarations("border: 1px solid black; COLOR: rgb(1, 2, 3) !important");
        assert_eq!(
            declarations,
            vec![
                Declaration {
                    name: "border".into(),
                    value: "1px solid black".into()
                },
                Declaration {
                    name: "color".into(),
                    value: "rgb(1, 2, 3)".into()
                },
            ]
        );

        let mut styles = CssStyles::default();
        apply_declarations(&mut styles, &declarations);
        assert_eq!(styles.border_width, Edges::uniform(1.0));
        assert_eq!(styles.border_style, BorderStyle::Solid);
        assert_eq!(styles.color, Color::new(1, 2, 3, 255));
    }

    #[test]
    fn test_malformed_declarations_are_skipped() {
        let declarations = parse_declarations("color red; : x; font-weight: bold");
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].name, "font-weight");
    }

    #[test]
    fn test_parse_stylesheet() {
        let rules = parse_stylesheet("p{color:red}\n div .note , #main { font-style: italic; }");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].selector, "p");
        assert_eq!(rules[0].declarations[0].value, "red");
        assert_eq!(rules[1].selector, "div .note , #main");
    }

    #[test]
    fn test_parse_stylesheet_skips_at_rules() {
        let rules = parse_stylesheet(
            "@import url(a.css);\n@media screen { p { color: red } }\nb { font-weight: bold }",
        );
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selector, "b");
    }
}
