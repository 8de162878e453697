// src/utils/html.rs

use std::collections::HashSet;

/// Entities ammonia's serializer emits for plain text, in decode order.
/// `&amp;` goes last so `&amp;lt;` stays the literal text `&lt;`.
const TEXT_ENTITIES: [(&str, &str); 6] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", "\u{a0}"),
    ("&amp;", "&"),
];

/// Reduces editor input to plain text. Every tag is stripped and `<script>`
/// or `<style>` go together with their content. The text itself is returned
/// unescaped: `&`, `<` and `>` typed by the editor survive as they are.
pub fn clean_html(input: &str) -> String {
    let stripped = ammonia::Builder::new().tags(HashSet::new()).clean(input).to_string();
    TEXT_ENTITIES
        .iter()
        .fold(stripped, |text, (entity, plain)| text.replace(entity, plain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(clean_html("How many continents are there in the world?"), "How many continents are there in the world?");
        assert_eq!(clean_html("Is 3 < 5 & 5 > 3?"), "Is 3 < 5 & 5 > 3?");
        assert_eq!(clean_html("A & B"), "A & B");
        assert_eq!(clean_html("Tom's \"quiz\""), "Tom's \"quiz\"");
    }

    #[test]
    fn markup_is_stripped() {
        assert_eq!(clean_html("<script>alert(1)</script>"), "");
        assert_eq!(clean_html("<b onclick=\"x()\">Nile</b>"), "Nile");
        assert_eq!(clean_html("<img src=x onerror=alert(1)>Giza"), "Giza");
    }
}
