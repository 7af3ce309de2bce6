use crate::{Class, Perm, Qid};
use std::fmt;

/// `path version type`, with path and type in hex, as Plan 9 prints a qid in
/// error strings.
impl fmt::Display for Qid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:016x} {} {:02x}",
            self.path,
            self.version,
            self.qtype.bits()
        )
    }
}

impl fmt::Display for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut result = String::with_capacity(10);

        result.push(if self.is_dir() { 'd' } else { '-' });
        for class in [Class::Owner, Class::Group, Class::Other] {
            for (bit, c) in [(4, 'r'), (2, 'w'), (1, 'x')] {
                result.push(if self.permits(class, bit) { c } else { '-' });
            }
        }

        f.write_str(&result)
    }
}
