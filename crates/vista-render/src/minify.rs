use minify_html::Cfg;

/// Optional HTML minification step.
///
/// A disabled minifier passes documents through byte for byte.
pub struct Minifier {
    cfg: Option<Cfg>,
}

impl Minifier {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self::disabled();
        }
        let mut cfg = Cfg::new();
        cfg.minify_css = true;
        cfg.keep_html_and_head_opening_tags = true;
        Self { cfg: Some(cfg) }
    }

    pub fn disabled() -> Self {
        Self { cfg: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.cfg.is_some()
    }

    pub fn minify(&self, input: Vec<u8>) -> Vec<u8> {
        match &self.cfg {
            Some(cfg) => minify_html::minify(&input, cfg),
            None => input,
        }
    }
}

impl std::fmt::Debug for Minifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Minifier")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<html>\n  <head>\n    <style> body {  color : red ; } </style>\n  </head>\n  <body>\n    <p>  hello    world  </p>\n  </body>\n</html>\n";

    #[test]
    fn disabled_is_passthrough() {
        let m = Minifier::disabled();
        assert!(!m.is_enabled());
        assert_eq!(m.minify(DOC.as_bytes().to_vec()), DOC.as_bytes());
        assert!(!Minifier::new(false).is_enabled());
    }

    #[test]
    fn enabled_shrinks_and_keeps_text() {
        let m = Minifier::new(true);
        let out = m.minify(DOC.as_bytes().to_vec());
        assert!(out.len() < DOC.len());
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("hello world"));
    }
}
