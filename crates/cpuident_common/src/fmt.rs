use core::fmt::{self, Formatter, Write};

/// Writer adapter that indents every line written through it.
///
/// Used to nest `Display` output of sub-structures into a report.
pub struct Indenter<'a, 'b> {
    inner: &'a mut Formatter<'b>,
    indent: &'a str,
    needs_indent: bool,
}

impl<'a, 'b> Indenter<'a, 'b> {
    pub fn new(f: &'a mut Formatter<'b>) -> Self {
        Self {
            inner: f,
            indent: "    ",
            needs_indent: true,
        }
    }

    pub fn set_indent(&mut self, indent: &'a str) {
        self.indent = indent;
    }
}

impl Write for Indenter<'_, '_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for (idx, line) in s.split('\n').enumerate() {
            if idx > 0 {
                self.inner.write_char('\n')?;

                // Draw another indent at the start of the next line
                self.needs_indent = true;
            }
            if line.is_empty() {
                continue;
            }

            if self.needs_indent {
                self.inner.write_str(self.indent)?;
                self.needs_indent = false;
            }

            self.inner.write_str(line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::fmt::{self, Write};

    use super::Indenter;

    struct Nested;

    impl fmt::Display for Nested {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "Outer:")?;
            let mut indenter = Indenter::new(f);
            writeln!(indenter, "first")?;
            indenter.set_indent("> ");
            write!(indenter, "second\nthird")
        }
    }

    #[test]
    fn indents_each_line() {
        assert_eq!(Nested.to_string(), "Outer:\n    first\n> second\n> third");
    }
}
