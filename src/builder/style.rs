//! Stylesheet shared by every content document
//!
//! The rules target paginated e-readers: each `h1` starts a new page, body
//! text is a justified serif, images scale down to the page width, and KF8
//! capable Kindle devices switch to Bookerly.

/// Manifest href of the stylesheet, relative to the package document
pub const STYLESHEET_HREF: &str = "style.css";

pub const STYLESHEET_MIME: &str = "text/css";

const READER_STYLESHEET: &str = r#"@namespace epub "http://www.idpf.org/2007/ops";

body {
    font-family: Georgia, serif;
    line-height: 1.6;
    margin: 1em;
    text-align: justify;
}

h1 {
    font-size: 2em;
    font-weight: bold;
    margin-top: 1em;
    margin-bottom: 1em;
    text-align: center;
    page-break-before: always;
}

h2 {
    font-size: 1.5em;
    font-weight: bold;
    margin-top: 1em;
    margin-bottom: 0.5em;
}

h3 {
    font-size: 1.2em;
    font-weight: bold;
    margin-top: 0.8em;
    margin-bottom: 0.4em;
}

p {
    margin: 0.5em 0;
    text-indent: 1.5em;
}

p.first-paragraph,
p.placeholder {
    text-indent: 0;
}

blockquote {
    margin: 1em 2em;
    font-style: italic;
}

code {
    font-family: "Courier New", monospace;
    background-color: #f4f4f4;
    padding: 0.2em 0.4em;
}

pre {
    font-family: "Courier New", monospace;
    background-color: #f4f4f4;
    padding: 1em;
    white-space: pre-wrap;
}

ul, ol {
    margin: 1em 0;
    padding-left: 2em;
}

li {
    margin: 0.5em 0;
}

a {
    color: #0066cc;
    text-decoration: underline;
}

img {
    max-width: 100%;
    height: auto;
}

.chapter-content {
    margin-top: 2em;
}

nav ol {
    list-style-type: none;
    padding-left: 0;
}

table {
    width: 100%;
    border-collapse: collapse;
    margin: 1em 0;
}

th, td {
    border: 1px solid #ddd;
    padding: 0.5em;
    text-align: left;
}

th {
    background-color: #f4f4f4;
    font-weight: bold;
}

@media amzn-kf8 {
    body {
        font-family: Bookerly, Georgia, serif;
    }
}
"#;

/// Returns the stylesheet linked from every page of the book
pub fn stylesheet() -> &'static str {
    READER_STYLESHEET
}

#[cfg(test)]
mod tests {
    use crate::builder::style::stylesheet;

    #[test]
    fn test_stylesheet_rules() {
        let css = stylesheet();

        assert!(css.contains("page-break-before: always"));
        assert!(css.contains("text-align: justify"));
        assert!(css.contains("max-width: 100%"));
        assert!(css.contains("@media amzn-kf8"));
        assert_eq!(css.matches('{').count(), css.matches('}').count());
    }
}
