//! PostScript tokenization and eexec decryption for Type 1 fonts.

/// Seed for the eexec-encrypted font program.
pub(crate) const EEXEC_SEED: u16 = 55_665;
/// Seed for encrypted charstrings and subroutines.
pub(crate) const CHARSTRING_SEED: u16 = 4_330;
const C1: u16 = 52_845;
const C2: u16 = 22_719;

/// Decrypts Type 1 ciphertext with the specified seed.
pub(crate) fn decrypt(cipher: impl IntoIterator<Item = u8>, seed: u16) -> impl Iterator<Item = u8> {
    let mut r = seed;
    cipher.into_iter().map(move |c| {
        #[allow(clippy::cast_possible_truncation)] // intentional
        let plain = c ^ (r >> 8) as u8;
        r = u16::from(c).wrapping_add(r).wrapping_mul(C1).wrapping_add(C2);
        plain
    })
}

/// Decrypts a charstring, dropping `len_iv` leading bytes. Negative `len_iv` means
/// that the charstring is not encrypted.
pub(crate) fn decrypt_charstring(cipher: &[u8], len_iv: i32) -> Vec<u8> {
    match usize::try_from(len_iv) {
        Ok(skip) => decrypt(cipher.iter().copied(), CHARSTRING_SEED).skip(skip).collect(),
        Err(_) => cipher.to_vec(),
    }
}

/// Decrypts the eexec section, which may be either binary or hex-encoded.
pub(crate) fn decrypt_eexec(data: &[u8]) -> Vec<u8> {
    let is_hex = data.len() >= 4 && data[..4].iter().all(u8::is_ascii_hexdigit);
    if is_hex {
        decrypt(decode_hex(data), EEXEC_SEED).skip(4).collect()
    } else {
        decrypt(data.iter().copied(), EEXEC_SEED).skip(4).collect()
    }
}

/// Decodes hex digits, ignoring whitespace and stopping at the first non-hex char.
fn decode_hex(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len() / 2);
    let mut high = None;
    for &byte in data {
        if is_whitespace(byte) {
            continue;
        }
        let Some(digit) = char::from(byte).to_digit(16) else {
            break;
        };
        #[allow(clippy::cast_possible_truncation)] // hex digits are < 16
        let digit = digit as u8;
        match high.take() {
            None => high = Some(digit),
            Some(high) => output.push((high << 4) | digit),
        }
    }
    if let Some(high) = high {
        output.push(high << 4);
    }
    output
}

/// Returns the position of encrypted data following the `eexec` token ending at `pos`.
pub(crate) fn skip_eexec_whitespace(data: &[u8], mut pos: usize) -> Option<usize> {
    while pos < data.len() {
        match data[pos] {
            b' ' | b'\t' | b'\n' => {}
            // Only skip `\r` if it is followed by `\n`
            b'\r' if data.get(pos + 1) == Some(&b'\n') => {}
            _ => break,
        }
        pos += 1;
    }
    (pos < data.len()).then_some(pos)
}

pub(crate) fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\n' | b'\r' | b'\t' | b'\0' | 0x0c)
}

fn is_special(c: u8) -> bool {
    matches!(
        c,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Token<'a> {
    Int(i64),
    /// `(...)` string without delimiters.
    String(&'a [u8]),
    /// `<...>` string without delimiters.
    HexString(&'a [u8]),
    /// `{...}` procedure body.
    Proc(&'a [u8]),
    /// Binary data read with the `RD` / `-|` convention.
    Binary(&'a [u8]),
    /// Name without the leading `/`.
    Name(&'a [u8]),
    /// Executable names, reals and brackets.
    Raw(&'a [u8]),
}

#[derive(Debug, Clone)]
pub(crate) struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn data(&self) -> &'a [u8] {
        self.data
    }

    fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek_byte()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip_whitespace(&mut self) -> Option<()> {
        while is_whitespace(self.peek_byte()?) {
            self.pos += 1;
        }
        Some(())
    }

    fn skip_regular(&mut self) {
        while let Some(byte) = self.peek_byte() {
            if is_whitespace(byte) || is_special(byte) {
                break;
            }
            self.pos += 1;
        }
    }

    pub(crate) fn peek(&self) -> Option<Token<'a>> {
        self.clone().next()
    }

    /// Returns the next token, or `None` at the end of data or on a malformed token.
    pub(crate) fn next(&mut self) -> Option<Token<'a>> {
        loop {
            self.skip_whitespace()?;
            let start = self.pos;
            match self.next_byte()? {
                b'%' => {
                    while let Some(c) = self.next_byte() {
                        if c == b'\n' || c == b'\r' {
                            break;
                        }
                    }
                }
                b'{' => {
                    let mut depth = 1_usize;
                    while depth > 0 {
                        match self.next_byte()? {
                            b'{' => depth += 1,
                            b'}' => depth -= 1,
                            _ => {}
                        }
                    }
                    return Some(Token::Proc(&self.data[start + 1..self.pos - 1]));
                }
                b'(' => {
                    let mut depth = 1_usize;
                    while depth > 0 {
                        match self.next_byte()? {
                            b'(' => depth += 1,
                            b')' => depth -= 1,
                            b'\\' => {
                                self.next_byte()?;
                            }
                            _ => {}
                        }
                    }
                    return Some(Token::String(&self.data[start + 1..self.pos - 1]));
                }
                b'<' => {
                    if self.peek_byte() == Some(b'<') {
                        // Dictionary start; ignored
                        self.pos += 1;
                        continue;
                    }
                    loop {
                        let c = self.next_byte()?;
                        if c == b'>' {
                            break;
                        }
                        if !is_whitespace(c) && !c.is_ascii_hexdigit() {
                            return None;
                        }
                    }
                    return Some(Token::HexString(&self.data[start + 1..self.pos - 1]));
                }
                b'>' => {
                    // Dictionary end; ignored
                    if self.next_byte()? != b'>' {
                        return None;
                    }
                }
                b'/' => {
                    // Immediately evaluated names (`//name`) are treated as regular names
                    if self.peek_byte() == Some(b'/') {
                        self.pos += 1;
                    }
                    let name_start = self.pos;
                    self.skip_regular();
                    return Some(Token::Name(&self.data[name_start..self.pos]));
                }
                b'[' | b']' | b')' | b'}' => return Some(Token::Raw(&self.data[start..=start])),
                c => {
                    self.skip_regular();
                    let content = &self.data[start..self.pos];
                    if c.is_ascii_digit() || c == b'-' || c == b'+' {
                        if let Some(value) = decode_int(content) {
                            return Some(self.int_or_binary(value));
                        }
                    }
                    return Some(Token::Raw(content));
                }
            }
        }
    }

    /// An integer followed by `RD` or `-|` introduces binary data of the specified length.
    fn int_or_binary(&mut self, value: i64) -> Token<'a> {
        if !matches!(self.peek(), Some(Token::Raw(b"RD" | b"-|"))) {
            return Token::Int(value);
        }
        let Ok(len) = usize::try_from(value) else {
            return Token::Int(value);
        };
        let mut lookahead = self.clone();
        lookahead.next();
        // Binary data starts after a single whitespace char
        let start = lookahead.pos + 1;
        let Some(data) = start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
        else {
            return Token::Int(value);
        };
        self.pos = start + len;
        Token::Binary(data)
    }

    /// Skips the specified number of bytes.
    pub(crate) fn skip_bytes(&mut self, len: usize) {
        self.pos = (self.pos + len).min(self.data.len());
    }
}

/// Decodes an integer, optionally with a radix (e.g., `16#ff`).
fn decode_int(bytes: &[u8]) -> Option<i64> {
    let s = std::str::from_utf8(bytes).ok()?;
    if let Some((radix, digits)) = s.split_once('#') {
        let radix = radix.parse::<u32>().ok()?;
        if (2..=36).contains(&radix) {
            return i64::from_str_radix(digits, radix).ok();
        }
        return None;
    }
    s.parse().ok()
}

/// Parses a token as a number (integer or real).
pub(crate) fn token_number(token: Token<'_>) -> Option<f64> {
    match token {
        #[allow(clippy::cast_precision_loss)] // font values are small
        Token::Int(value) => Some(value as f64),
        Token::Raw(raw) => std::str::from_utf8(raw).ok()?.parse().ok(),
        _ => None,
    }
}

/// Simplified PostScript value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value<'a> {
    Number(f64),
    Bool(bool),
    String(&'a [u8]),
    Name(&'a [u8]),
    Array(Vec<Value<'a>>),
    Other,
}

impl<'a> Value<'a> {
    /// Reads a value starting from the next token of `lexer`.
    pub(crate) fn read(lexer: &mut Lexer<'a>) -> Option<Self> {
        let token = lexer.next()?;
        Self::from_token(token, lexer)
    }

    fn from_token(token: Token<'a>, lexer: &mut Lexer<'a>) -> Option<Self> {
        Some(match token {
            Token::Raw(b"[") => Self::Array(Self::read_array(lexer)?),
            Token::Raw(b"true") => Self::Bool(true),
            Token::Raw(b"false") => Self::Bool(false),
            Token::Proc(body) => {
                let mut inner = Lexer::new(body);
                let mut items = vec![];
                while let Some(token) = inner.next() {
                    items.push(Self::from_token(token, &mut inner)?);
                }
                Self::Array(items)
            }
            Token::String(s) => Self::String(s),
            Token::Name(name) => Self::Name(name),
            token => token_number(token).map_or(Self::Other, Self::Number),
        })
    }

    fn read_array(lexer: &mut Lexer<'a>) -> Option<Vec<Self>> {
        let mut items = vec![];
        loop {
            match lexer.next()? {
                Token::Raw(b"]") => return Some(items),
                token => items.push(Self::from_token(token, lexer)?),
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)] // font values are within `f32` range
    pub(crate) fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Number(value) => Some(*value as f32),
            _ => None,
        }
    }

    /// Returns the array of numbers, or `None` if this is not a flat numeric array.
    pub(crate) fn as_numbers(&self) -> Option<Vec<f32>> {
        match self {
            Self::Array(items) => items.iter().map(Self::as_f32).collect(),
            _ => None,
        }
    }

    /// Returns the text of a string or name.
    pub(crate) fn as_text(&self) -> Option<String> {
        match self {
            Self::String(s) | Self::Name(s) => Some(String::from_utf8_lossy(s).into_owned()),
            _ => None,
        }
    }
}
