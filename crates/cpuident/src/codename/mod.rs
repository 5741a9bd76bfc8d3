//! Codename resolution
//! 
//! Codenames are looked up in a static database of `(vendor, architecture, family, model range, stepping range, brand)` entries.
//! The most specific matching entry wins, where the specificity is the combined width of the model and stepping ranges.
//! Entries of equal specificity are resolved in registration order.

use once_cell::sync::Lazy;

use crate::{Architecture, Vendor};

mod amd;
mod arm;
mod intel;

/// Full stepping range
pub const ANY_STEPPING : (u32, u32) = (0, 0xF);

/// Single codename database entry
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CodenameEntry {
    pub vendor:       Vendor,
    pub architecture: Architecture,
    /// Display family for x86, part number for ARM
    pub family:       u32,
    /// Inclusive display model range for x86, variant range for ARM
    pub models:       (u32, u32),
    /// Inclusive stepping range for x86, revision range for ARM
    pub steppings:    (u32, u32),
    /// Case-sensitive substring the brand string needs to contain
    pub brand:        Option<&'static str>,
    pub codename:     &'static str,
}

impl CodenameEntry {
    pub const fn new(vendor: Vendor, architecture: Architecture, family: u32, models: (u32, u32), codename: &'static str) -> Self {
        Self {
            vendor,
            architecture,
            family,
            models,
            steppings: ANY_STEPPING,
            brand: None,
            codename,
        }
    }

    pub const fn steppings(mut self, min: u32, max: u32) -> Self {
        self.steppings = (min, max);
        self
    }

    pub const fn stepping(self, stepping: u32) -> Self {
        self.steppings(stepping, stepping)
    }

    pub const fn brand(mut self, brand: &'static str) -> Self {
        self.brand = Some(brand);
        self
    }

    /// Combined width of the model and stepping ranges, lower is more specific
    pub fn span(&self) -> u32 {
        self.models.1.saturating_sub(self.models.0) + self.steppings.1.saturating_sub(self.steppings.0)
    }

    fn matches(&self, vendor: Vendor, architecture: Architecture, family: u32, model: u32, stepping: u32, brand_str: &str) -> bool {
        self.vendor == vendor &&
        self.architecture == architecture &&
        self.family == family &&
        (self.models.0..=self.models.1).contains(&model) &&
        (self.steppings.0..=self.steppings.1).contains(&stepping) &&
        self.brand.map_or(true, |brand| brand_str.contains(brand))
    }
}

/// Read-only collection of codename entries
pub struct CodenameDatabase {
    entries: Vec<CodenameEntry>,
}

static GLOBAL_DATABASE : Lazy<CodenameDatabase> = Lazy::new(|| {
    let entries = intel::CODENAMES.iter()
        .chain(amd::CODENAMES)
        .chain(arm::CODENAMES)
        .copied()
        .collect();
    CodenameDatabase::new(entries)
});

impl CodenameDatabase {
    /// Create a database, the order of `entries` is the registration order.
    pub fn new(entries: Vec<CodenameEntry>) -> Self {
        Self { entries }
    }

    /// Get the built-in database
    pub fn global() -> &'static CodenameDatabase {
        &GLOBAL_DATABASE
    }

    pub fn entries(&self) -> &[CodenameEntry] {
        &self.entries
    }

    /// Find the most specific entry matching the identification values.
    pub fn resolve_entry(&self, vendor: Vendor, architecture: Architecture, family: u32, model: u32, stepping: u32, brand_str: &str) -> Option<&CodenameEntry> {
        let mut best : Option<&CodenameEntry> = None;
        for entry in &self.entries {
            if !entry.matches(vendor, architecture, family, model, stepping, brand_str) {
                continue;
            }
            // Strictly narrower only, so the first registered entry wins a tie
            if best.map_or(true, |best| entry.span() < best.span()) {
                best = Some(entry);
            }
        }
        best
    }

    /// Resolve the codename of the most specific entry matching the identification values.
    pub fn resolve(&self, vendor: Vendor, architecture: Architecture, family: u32, model: u32, stepping: u32, brand_str: &str) -> Option<String> {
        self.resolve_entry(vendor, architecture, family, model, stepping, brand_str)
            .map(|entry| entry.codename.to_string())
    }

    /// Get all distinct codenames for a vendor, in registration order.
    pub fn codenames(&self, vendor: Vendor) -> Vec<String> {
        let mut names : Vec<String> = Vec::new();
        for entry in self.entries.iter().filter(|entry| entry.vendor == vendor) {
            if !names.iter().any(|name| name == entry.codename) {
                names.push(entry.codename.to_string());
            }
        }
        names
    }
}

/// Resolve a codename against the built-in database.
/// 
/// For x86 `family` and `model` are the display values, for ARM they are the part number and variant, with the revision as stepping.
pub fn resolve_codename(vendor: Vendor, architecture: Architecture, family: u32, model: u32, stepping: u32, brand_str: &str) -> Option<String> {
    CodenameDatabase::global().resolve(vendor, architecture, family, model, stepping, brand_str)
}
