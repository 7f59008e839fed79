//! Normalization of raw terminal output before pattern matching.

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Strips carriage returns, bells and ANSI escape sequences.
///
/// An escape sequence split across two reads is held back until the rest of
/// it arrives.
#[derive(Debug, Default)]
pub(crate) struct OutputFilter {
    carry: Vec<u8>,
}

/// Length of the escape sequence at the start of `data`, or `None` if it is
/// incomplete.
fn escape_len(data: &[u8]) -> Option<usize> {
    match data.get(1)? {
        b'[' => {
            // CSI: parameter and intermediate bytes, then one final byte.
            data[2..]
                .iter()
                .position(|b| (0x40..=0x7e).contains(b))
                .map(|i| i + 3)
        }
        b']' => {
            // OSC: terminated by BEL or ESC \.
            let body = &data[2..];
            body.iter().enumerate().find_map(|(i, &b)| match b {
                BEL => Some(i + 3),
                ESC if body.get(i + 1) == Some(&b'\\') => Some(i + 4),
                _ => None,
            })
        }
        _ => Some(2),
    }
}

impl OutputFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter `chunk` and append the visible bytes to `out`.
    pub fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        let mut data = std::mem::take(&mut self.carry);
        data.extend_from_slice(chunk);

        let mut i = 0;
        while i < data.len() {
            match data[i] {
                b'\r' | BEL => i += 1,
                ESC => match escape_len(&data[i..]) {
                    Some(len) => i += len,
                    None => {
                        self.carry = data[i..].to_vec();
                        return;
                    }
                },
                b => {
                    out.push(b);
                    i += 1;
                }
            }
        }
    }
}
