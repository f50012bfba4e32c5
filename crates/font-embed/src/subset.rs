//! Normalized glyph subset.

use std::collections::BTreeMap;

use crate::{
    errors::EmbedError,
    spec::{Subset, SubsetGlyph, NO_UNICODE, VID_BEGIN},
};

const NOTDEF: &str = ".notdef";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GlyphEntry {
    pub(crate) id: u16,
    pub(crate) name: Option<String>,
    pub(crate) unicode: u32,
    /// Glyph index in the output font; assigned when the glyph is retrieved from the source.
    pub(crate) gid: Option<u16>,
}

/// Normalized glyph subset: unique real glyphs indexed by client id and by name,
/// plus virtual glyphs kept separately.
#[derive(Debug, Default)]
pub(crate) struct GlyphTable {
    by_id: BTreeMap<u16, GlyphEntry>,
    by_name: BTreeMap<String, u16>,
    /// Virtual glyphs sorted by id. These are never deduplicated.
    vids: Vec<SubsetGlyph>,
    notdef_id: u16,
    next_gid: u16,
    scratch: Vec<SubsetGlyph>,
}

impl GlyphTable {
    /// Replaces the table contents with the normalized `subset`.
    pub(crate) fn normalize(&mut self, subset: &Subset<'_>) -> Result<(), EmbedError> {
        self.by_id.clear();
        self.by_name.clear();
        self.vids.clear();
        self.scratch.clear();
        self.next_gid = 0;

        self.notdef_id = match subset.names {
            Some(names) => {
                let pos = names.iter().position(|&name| name == NOTDEF);
                let pos = pos.ok_or_else(|| EmbedError::bad_spec("missing .notdef"))?;
                u16::try_from(pos).map_err(|_| EmbedError::bad_spec("missing .notdef"))?
            }
            None => 0,
        };

        self.scratch.push(SubsetGlyph::unmapped(self.notdef_id));
        self.scratch.extend_from_slice(subset.glyphs);
        self.scratch.sort_by_key(|glyph| glyph.id);

        for glyph in &self.scratch {
            if glyph.id >= VID_BEGIN {
                self.vids.push(*glyph);
                continue;
            }
            let entry = self.by_id.entry(glyph.id).or_insert(GlyphEntry {
                id: glyph.id,
                name: None,
                unicode: glyph.unicode,
                gid: None,
            });
            entry.unicode = entry.unicode.min(glyph.unicode);
        }
        if let Some(notdef) = self.by_id.get_mut(&self.notdef_id) {
            notdef.unicode = NO_UNICODE;
        }

        if let Some(names) = subset.names {
            // `unwrap()` is safe: the table contains at least `.notdef`
            let max_id = *self.by_id.keys().next_back().unwrap();
            if usize::from(max_id) >= names.len() {
                return Err(EmbedError::bad_spec(format_args!(
                    "name index out of range: {max_id} (name count: {})",
                    names.len()
                )));
            }
            for entry in self.by_id.values_mut() {
                let name = names[usize::from(entry.id)];
                entry.name = Some(name.to_owned());
                self.by_name.entry(name.to_owned()).or_insert(entry.id);
            }
        }

        log::debug!(
            "normalized subset: {} glyphs, {} virtual ids, .notdef id {}",
            self.by_id.len(),
            self.vids.len(),
            self.notdef_id
        );
        Ok(())
    }

    pub(crate) fn notdef_id(&self) -> u16 {
        self.notdef_id
    }

    pub(crate) fn has_names(&self) -> bool {
        !self.by_name.is_empty()
    }

    /// Number of real glyphs.
    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    pub(crate) fn get(&self, id: u16) -> Option<&GlyphEntry> {
        self.by_id.get(&id)
    }

    pub(crate) fn id_by_name(&self, name: &str) -> Option<u16> {
        self.by_name.get(name).copied()
    }

    /// Ids in the order glyphs are retrieved from the source: `.notdef` first, then ascending ids.
    pub(crate) fn request_order(&self) -> impl Iterator<Item = u16> + '_ {
        let notdef_id = self.notdef_id;
        let rest = self.by_id.keys().copied().filter(move |&id| id != notdef_id);
        [notdef_id].into_iter().chain(rest)
    }

    /// Assigns the next output GID to the glyph with the specified id.
    pub(crate) fn assign_gid(&mut self, id: u16) -> Result<u16, EmbedError> {
        let entry = self
            .by_id
            .get_mut(&id)
            .ok_or_else(|| EmbedError::internal(format_args!("glyph {id} is not in the subset")))?;
        if let Some(gid) = entry.gid {
            return Ok(gid);
        }
        let gid = self.next_gid;
        entry.gid = Some(gid);
        self.next_gid = gid
            .checked_add(1)
            .ok_or_else(|| EmbedError::internal("too many glyphs"))?;
        Ok(gid)
    }

    /// Resolves a client id to the output GID. Virtual ids map to themselves.
    pub(crate) fn gid(&self, id: u16) -> Option<u16> {
        if id >= VID_BEGIN {
            self.vids.iter().any(|vid| vid.id == id).then_some(id)
        } else {
            self.by_id.get(&id)?.gid
        }
    }

    pub(crate) fn vids(&self) -> &[SubsetGlyph] {
        &self.vids
    }

    /// Real glyphs in output GID order.
    pub(crate) fn by_gid(&self) -> Vec<&GlyphEntry> {
        let mut entries: Vec<_> = self.by_id.values().filter(|entry| entry.gid.is_some()).collect();
        entries.sort_unstable_by_key(|entry| entry.gid);
        entries
    }

    /// Overrides the Unicode value of a real glyph.
    pub(crate) fn set_unicode(&mut self, id: u16, unicode: u32) {
        if let Some(entry) = self.by_id.get_mut(&id) {
            entry.unicode = unicode;
        }
    }

    /// All Unicode values present in the subset, regardless of whether GIDs are assigned.
    pub(crate) fn used_unicodes(&self) -> impl Iterator<Item = u32> + '_ {
        let real = self.by_id.values().map(|entry| entry.unicode);
        let virtual_ids = self.vids.iter().map(|vid| vid.unicode);
        real.chain(virtual_ids).filter(|&code| code != NO_UNICODE)
    }

    /// Unicode mapping `(code, GID)` for mapped glyphs, including virtual glyphs.
    pub(crate) fn unicode_mapping(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        let real = self
            .by_id
            .values()
            .filter(|entry| entry.unicode != NO_UNICODE)
            .filter_map(|entry| Some((entry.unicode, entry.gid?)));
        let virtual_ids = self
            .vids
            .iter()
            .filter(|vid| vid.unicode != NO_UNICODE)
            .map(|vid| (vid.unicode, vid.id));
        real.chain(virtual_ids)
    }
}
