//! Embedding specification supplied by the client.

use core::{fmt, ops};

use crate::errors::{EmbedError, ErrorKind};

/// Unicode value marking a glyph without a Unicode mapping.
pub const NO_UNICODE: u32 = 0xffff;

/// First virtual glyph id. Ids in `VID_BEGIN..=u16::MAX` are not backed by real glyphs;
/// they can be used in the `cmap` and kerning data only and map to themselves as GIDs.
pub const VID_BEGIN: u16 = 64_000;

/// Maximum number of user design vector values.
pub const MAX_UDV_LEN: usize = 4;

/// Embedding flags.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EmbedFlags(u32);

impl fmt::Debug for EmbedFlags {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(EmbedFlags, &str); 3] = [
            (EmbedFlags::FORCE_LANGUAGE_GROUP_1, "FORCE_LANGUAGE_GROUP_1"),
            (EmbedFlags::WRITE_SVG, "WRITE_SVG"),
            (EmbedFlags::FORCE_IDENTITY_ROS, "FORCE_IDENTITY_ROS"),
        ];

        let mut set = formatter.debug_set();
        for (flag, name) in NAMES {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

impl EmbedFlags {
    /// Forces `LanguageGroup` 1 in all Private DICTs of the output font.
    pub const FORCE_LANGUAGE_GROUP_1: Self = Self(1);
    /// Writes an SVG font instead of a CEF. Mutually exclusive with
    /// [`Self::FORCE_LANGUAGE_GROUP_1`].
    pub const WRITE_SVG: Self = Self(1 << 1);
    /// Forces CID Registry-Ordering-Supplement to `Adobe-Identity-0` for CID-keyed output.
    pub const FORCE_IDENTITY_ROS: Self = Self(1 << 2);

    /// Returns flags with no bits set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns raw flag bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Checks whether all bits of `other` are set in these flags.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl ops::BitOr for EmbedFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for EmbedFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Glyph requested in the subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubsetGlyph {
    /// Client glyph id. With glyph names, this is an index into [`Subset::names`];
    /// for CID-keyed sources, this is a CID; otherwise, this is the glyph index
    /// in the source font. Name-keyed Type 1 sources require names.
    pub id: u16,
    /// Unicode value or [`NO_UNICODE`].
    pub unicode: u32,
}

impl SubsetGlyph {
    /// Creates a glyph mapped to the specified Unicode value.
    pub const fn new(id: u16, unicode: u32) -> Self {
        Self { id, unicode }
    }

    /// Creates a glyph without a Unicode mapping.
    pub const fn unmapped(id: u16) -> Self {
        Self {
            id,
            unicode: NO_UNICODE,
        }
    }

    /// Checks whether this glyph has a virtual id.
    pub const fn is_virtual(&self) -> bool {
        self.id >= VID_BEGIN
    }
}

/// Glyph subset: glyphs to retain together with optional glyph names.
#[derive(Debug, Clone, Copy, Default)]
pub struct Subset<'a> {
    /// Requested glyphs in an arbitrary order. May contain duplicates.
    pub glyphs: &'a [SubsetGlyph],
    /// Glyph names indexed by [`SubsetGlyph::id`]. Required to retrieve glyphs by name
    /// from name-keyed sources; must contain `.notdef`.
    pub names: Option<&'a [&'a str]>,
}

/// Kerning pair in terms of client glyph ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernPair {
    /// Client id of the first (left) glyph.
    pub first: u16,
    /// Client id of the second (right) glyph.
    pub second: u16,
    /// Horizontal advance adjustment in font units.
    pub value: i16,
}

impl KernPair {
    /// Creates a kerning pair.
    pub const fn new(first: u16, second: u16, value: i16) -> Self {
        Self {
            first,
            second,
            value,
        }
    }
}

/// Specification of a single embedding call.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingSpec<'a> {
    /// Embedding flags.
    pub flags: EmbedFlags,
    /// Replacement for the font name in the CFF Name INDEX.
    pub new_font_name: Option<&'a str>,
    /// User design vector selecting a multiple master instance (up to [`MAX_UDV_LEN`] values).
    /// `None` selects the default instance.
    pub udv: Option<&'a [f32]>,
    /// URL to embed. Must be `None`; URL embedding is not supported.
    pub url: Option<&'a str>,
    /// Glyph subset.
    pub subset: Subset<'a>,
    /// Kerning pairs.
    pub kern: &'a [KernPair],
}

impl<'a> EmbeddingSpec<'a> {
    /// Creates a specification with the supplied subset and default values for other fields.
    pub fn new(glyphs: &'a [SubsetGlyph]) -> Self {
        Self {
            subset: Subset {
                glyphs,
                names: None,
            },
            ..Self::default()
        }
    }

    /// Sets glyph names.
    #[must_use]
    pub fn with_names(mut self, names: &'a [&'a str]) -> Self {
        self.subset.names = Some(names);
        self
    }

    /// Sets embedding flags.
    #[must_use]
    pub fn with_flags(mut self, flags: EmbedFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets kerning pairs.
    #[must_use]
    pub fn with_kerning(mut self, kern: &'a [KernPair]) -> Self {
        self.kern = kern;
        self
    }

    /// Checks spec fields that do not depend on the source font.
    pub(crate) fn validate(&self) -> Result<(), EmbedError> {
        if self.flags.contains(EmbedFlags::WRITE_SVG)
            && self.flags.contains(EmbedFlags::FORCE_LANGUAGE_GROUP_1)
        {
            return Err(EmbedError::bad_spec(
                "SVG output cannot be combined with forcing LanguageGroup 1",
            ));
        }
        if self.url.is_some() {
            return Err(EmbedError::new(
                ErrorKind::NotImplemented,
                "URL embedding is not supported",
            ));
        }
        if self.subset.glyphs.is_empty() {
            return Err(EmbedError::bad_spec("empty subset"));
        }
        if let Some(udv) = self.udv {
            if udv.len() > MAX_UDV_LEN {
                return Err(EmbedError::bad_spec(format_args!(
                    "user design vector has {} values; at most {MAX_UDV_LEN} are supported",
                    udv.len()
                )));
            }
        }
        Ok(())
    }
}

/// Output glyph reported to the glyph mapping callback of
/// [`Embedder::make_embedding_font()`](crate::Embedder::make_embedding_font()).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedGlyph<'a> {
    /// Client glyph id.
    pub id: u16,
    /// Glyph index in the output font.
    pub gid: u16,
    /// Glyph name, if names were supplied in the subset.
    pub name: Option<&'a str>,
    /// Unicode value assigned to the glyph, or [`NO_UNICODE`].
    pub unicode: u32,
}
