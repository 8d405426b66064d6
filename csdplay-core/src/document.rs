//! Editor documents: entity decoding, editor mode selection and the
//! embedded UI-description block.

use std::sync::LazyLock;

use regex::Regex;

const WEB_ELEMENTS_OPEN: &str = "<CsoundWebElements>";

static WEB_ELEMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<CsoundWebElements>(.*?)</CsoundWebElements>")
        .expect("web elements pattern is valid")
});

/// Decode HTML character references the way a browser does in text:
/// the full named table, numeric references and legacy names written
/// without the trailing semicolon. Unknown names are left untouched.
pub fn decode_entities(raw: &str) -> String {
    htmlize::unescape(raw).into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsoundFileType {
    Orc,
    Csd,
    Sco,
}

/// Highlighting and editability chosen for a code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Python,
    C,
    /// Read-only Csound fragment.
    Csound(CsoundFileType),
    /// Full editable `<CsoundSynthesizer>` document with play controls.
    CsoundDocument,
    Plain,
}

impl EditorMode {
    pub fn classify(data: &str, lang: Option<&str>) -> Self {
        match lang {
            Some("python") => EditorMode::Python,
            Some("c") => EditorMode::C,
            Some("orc") => EditorMode::Csound(CsoundFileType::Orc),
            Some("csd") => EditorMode::Csound(CsoundFileType::Csd),
            Some("sco") => EditorMode::Csound(CsoundFileType::Sco),
            _ if data.contains("CsoundSynthesizer") => EditorMode::CsoundDocument,
            _ => EditorMode::Plain,
        }
    }

    pub fn is_editable(self) -> bool {
        self == EditorMode::CsoundDocument
    }
}

/// A code block as it arrives from page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    text: String,
    mode: EditorMode,
    play_controls: bool,
}

impl CodeBlock {
    pub fn new(data: &str, lang: Option<&str>) -> Self {
        let text = decode_entities(data);
        let play_controls = text.contains("CsoundSynthesizer") && lang != Some("csd");
        Self {
            mode: EditorMode::classify(&text, lang),
            text,
            play_controls,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    /// Transport controls attach to any block holding a
    /// `<CsoundSynthesizer>` document, except blocks tagged `csd`. The
    /// block stays read-only unless its mode is editable.
    pub fn has_play_controls(&self) -> bool {
        self.play_controls
    }

    pub fn buffer(&self) -> EditorBuffer {
        EditorBuffer::new(self.text.clone())
    }
}

/// Current editor contents. Each edit replaces the whole text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorBuffer {
    initial: String,
    current: String,
}

impl EditorBuffer {
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        Self {
            current: initial.clone(),
            initial,
        }
    }

    pub fn replace(&mut self, text: impl Into<String>) {
        self.current = text.into();
    }

    pub fn text(&self) -> &str {
        &self.current
    }

    pub fn initial(&self) -> &str {
        &self.initial
    }

    pub fn is_modified(&self) -> bool {
        self.current != self.initial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_web_elements_payload() {
        let doc = "<CsoundSynthesizer>\
                   <CsoundWebElements>HELLO</CsoundWebElements>\
                   </CsoundSynthesizer>";
        assert_eq!(web_elements(doc).as_deref(), Some("HELLO"));
    }

    #[test]
    fn web_elements_spanning_lines_are_flattened() {
        let doc = "<CsoundWebElements>\n<slider id=\"a\"/>\n<button/>\n</CsoundWebElements>";
        assert_eq!(
            web_elements(doc).as_deref(),
            Some("<slider id=\"a\"/><button/>")
        );
    }

    #[test]
    fn only_first_block_is_used() {
        let doc = "<CsoundWebElements>one</CsoundWebElements>\
                   <CsoundWebElements>two</CsoundWebElements>";
        assert_eq!(web_elements(doc).as_deref(), Some("one"));
    }

    #[test]
    fn unterminated_block_yields_nothing() {
        assert_eq!(web_elements("<CsoundWebElements>dangling"), None);
        assert_eq!(web_elements("<CsoundSynthesizer></CsoundSynthesizer>"), None);
    }

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(
            decode_entities("&lt;CsoundSynthesizer&gt; a &amp;&amp; b &#34;x&#x27;"),
            "<CsoundSynthesizer> a && b \"x'"
        );
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn decodes_typographic_entities() {
        assert_eq!(
            decode_entities("wait&hellip; 1&ndash;2 it&rsquo;s &copy;"),
            "wait\u{2026} 1\u{2013}2 it\u{2019}s \u{a9}"
        );
    }

    #[test]
    fn decodes_legacy_entities_without_semicolon() {
        assert_eq!(decode_entities("a &amp b"), "a & b");
        assert_eq!(decode_entities("&lt &gt"), "< >");
    }

    #[test]
    fn classifies_editor_modes() {
        assert_eq!(EditorMode::classify("print(1)", Some("python")), EditorMode::Python);
        assert_eq!(EditorMode::classify("int x;", Some("c")), EditorMode::C);
        assert_eq!(
            EditorMode::classify("<CsoundSynthesizer>", Some("csd")),
            EditorMode::Csound(CsoundFileType::Csd)
        );
        assert_eq!(
            EditorMode::classify("instr 1\nendin", Some("orc")),
            EditorMode::Csound(CsoundFileType::Orc)
        );
        assert_eq!(
            EditorMode::classify("<CsoundSynthesizer></CsoundSynthesizer>", None),
            EditorMode::CsoundDocument
        );
        assert_eq!(EditorMode::classify("just text", None), EditorMode::Plain);
    }

    #[test]
    fn code_block_decodes_before_editing() {
        let block = CodeBlock::new("&lt;CsoundSynthesizer&gt;&lt;/CsoundSynthesizer&gt;", None);
        assert_eq!(block.text(), "<CsoundSynthesizer></CsoundSynthesizer>");
        assert!(block.has_play_controls());
        let buffer = block.buffer();
        assert_eq!(buffer.text(), block.text());
        assert!(!buffer.is_modified());
    }

    #[test]
    fn play_controls_follow_document_content() {
        let doc = "<CsoundSynthesizer></CsoundSynthesizer>";
        let orc = CodeBlock::new(doc, Some("orc"));
        assert!(orc.has_play_controls());
        assert!(!orc.mode().is_editable());
        assert!(CodeBlock::new(doc, Some("python")).has_play_controls());
        assert!(!CodeBlock::new(doc, Some("csd")).has_play_controls());
        assert!(!CodeBlock::new("instr 1\nendin", Some("orc")).has_play_controls());
        assert!(!CodeBlock::new("plain", None).has_play_controls());
    }

    #[test]
    fn buffer_replaces_wholesale() {
        let mut buffer = EditorBuffer::new("a");
        buffer.replace("b");
        assert_eq!(buffer.text(), "b");
        assert_eq!(buffer.initial(), "a");
        assert!(buffer.is_modified());
    }
}
