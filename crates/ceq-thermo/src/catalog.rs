use crate::error::{ThermoError, ThermoResult};
use crate::nasa7::Nasa7;
use crate::species::Species;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesCatalogEntry {
    pub species: Species,
    pub canonical_id: &'static str,
    pub display_name: &'static str,
    pub aliases: &'static [&'static str],
    pub fit: Nasa7,
}

impl SpeciesCatalogEntry {
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_ascii_lowercase();
        if query.is_empty() {
            return true;
        }

        self.canonical_id.to_ascii_lowercase() == query
            || self.display_name.to_ascii_lowercase().contains(&query)
            || self
                .aliases
                .iter()
                .any(|alias| alias.to_ascii_lowercase().contains(&query))
    }
}

const T_LOW: f64 = 200.0;
const T_MID: f64 = 1000.0;
const T_HIGH: f64 = 3500.0;

const fn fit(low: [f64; 7], high: [f64; 7]) -> Nasa7 {
    Nasa7::new(T_LOW, T_MID, T_HIGH, low, high)
}

// GRI-Mech 3.0 coefficient sets, restricted to a common [200, 3500] K range.
const SPECIES_CATALOG: [SpeciesCatalogEntry; 14] = [
    SpeciesCatalogEntry {
        species: Species::Ar,
        canonical_id: "Ar",
        display_name: "Argon",
        aliases: &["argon"],
        fit: Nasa7::uniform(T_LOW, T_HIGH, [2.5, 0.0, 0.0, 0.0, 0.0, -745.375, 4.366]),
    },
    SpeciesCatalogEntry {
        species: Species::CH4,
        canonical_id: "CH4",
        display_name: "Methane",
        aliases: &["methane", "natural gas"],
        fit: fit(
            [
                5.14987613,
                -1.36709788e-2,
                4.91800599e-5,
                -4.84743026e-8,
                1.66693956e-11,
                -1.02466476e4,
                -4.64130376,
            ],
            [
                7.4851495e-2,
                1.33909467e-2,
                -5.73285809e-6,
                1.22292535e-9,
                -1.0181523e-13,
                -9.46834459e3,
                1.84373180e1,
            ],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::CO,
        canonical_id: "CO",
        display_name: "Carbon Monoxide",
        aliases: &["carbon monoxide"],
        fit: fit(
            [
                3.57953347,
                -6.1035368e-4,
                1.01681433e-6,
                9.07005884e-10,
                -9.04424499e-13,
                -1.4344086e4,
                3.50840928,
            ],
            [
                2.71518561,
                2.06252743e-3,
                -9.98825771e-7,
                2.30053008e-10,
                -2.03647716e-14,
                -1.41518724e4,
                7.81868772,
            ],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::CO2,
        canonical_id: "CO2",
        display_name: "Carbon Dioxide",
        aliases: &["carbon dioxide"],
        fit: fit(
            [
                2.35677352,
                8.98459677e-3,
                -7.12356269e-6,
                2.45919022e-9,
                -1.43699548e-13,
                -4.83719697e4,
                9.90105222,
            ],
            [
                3.85746029,
                4.41437026e-3,
                -2.21481404e-6,
                5.23490188e-10,
                -4.72084164e-14,
                -4.8759166e4,
                2.27163806,
            ],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::H,
        canonical_id: "H",
        display_name: "Atomic Hydrogen",
        aliases: &["hydrogen atom"],
        fit: Nasa7::uniform(
            T_LOW,
            T_HIGH,
            [2.5, 0.0, 0.0, 0.0, 0.0, 2.54736599e4, -0.446682853],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::H2,
        canonical_id: "H2",
        display_name: "Hydrogen",
        aliases: &["hydrogen"],
        fit: fit(
            [
                2.34433112,
                7.98052075e-3,
                -1.9478151e-5,
                2.01572094e-8,
                -7.37611761e-12,
                -917.935173,
                0.683010238,
            ],
            [
                3.3372792,
                -4.94024731e-5,
                4.99456778e-7,
                -1.79566394e-10,
                2.00255376e-14,
                -950.158922,
                -3.20502331,
            ],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::H2O,
        canonical_id: "H2O",
        display_name: "Water",
        aliases: &["water", "steam"],
        fit: fit(
            [
                4.19864056,
                -2.0364341e-3,
                6.52040211e-6,
                -5.48797062e-9,
                1.77197817e-12,
                -3.02937267e4,
                -0.849032208,
            ],
            [
                3.03399249,
                2.17691804e-3,
                -1.64072518e-7,
                -9.7041987e-11,
                1.68200992e-14,
                -3.00042971e4,
                4.9667701,
            ],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::N,
        canonical_id: "N",
        display_name: "Atomic Nitrogen",
        aliases: &["nitrogen atom"],
        fit: fit(
            [2.5, 0.0, 0.0, 0.0, 0.0, 5.6104637e4, 4.1939087],
            [
                2.4159429,
                1.7489065e-4,
                -1.1902369e-7,
                3.0226245e-11,
                -2.0360982e-15,
                5.6133773e4,
                4.6496096,
            ],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::NO,
        canonical_id: "NO",
        display_name: "Nitric Oxide",
        aliases: &["nitric oxide"],
        fit: fit(
            [
                4.2184763,
                -4.638976e-3,
                1.1041022e-5,
                -9.3361354e-9,
                2.803577e-12,
                9.844623e3,
                2.2808464,
            ],
            [
                3.2606056,
                1.1911043e-3,
                -4.2917048e-7,
                6.9457669e-11,
                -4.0336099e-15,
                9.9209746e3,
                6.3693027,
            ],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::NO2,
        canonical_id: "NO2",
        display_name: "Nitrogen Dioxide",
        aliases: &["nitrogen dioxide"],
        fit: fit(
            [
                3.9440312,
                -1.585429e-3,
                1.6657812e-5,
                -2.0475426e-8,
                7.8350564e-12,
                2.8966179e3,
                6.3119917,
            ],
            [
                4.8847542,
                2.1723956e-3,
                -8.2806906e-7,
                1.574751e-10,
                -1.0510895e-14,
                2.3164983e3,
                -0.11741695,
            ],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::N2,
        canonical_id: "N2",
        display_name: "Nitrogen",
        aliases: &["nitrogen"],
        fit: fit(
            [
                3.298677,
                1.4082404e-3,
                -3.963222e-6,
                5.641515e-9,
                -2.444854e-12,
                -1.0208999e3,
                3.950372,
            ],
            [
                2.92664,
                1.4879768e-3,
                -5.68476e-7,
                1.009703e-10,
                -6.753351e-15,
                -9.227977e2,
                5.980528,
            ],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::O,
        canonical_id: "O",
        display_name: "Atomic Oxygen",
        aliases: &["oxygen atom"],
        fit: fit(
            [
                3.1682671,
                -3.27931884e-3,
                6.64306396e-6,
                -6.12806624e-9,
                2.11265971e-12,
                2.91222592e4,
                2.05193346,
            ],
            [
                2.56942078,
                -8.59741137e-5,
                4.19484589e-8,
                -1.00177799e-11,
                1.22833691e-15,
                2.92175791e4,
                4.78433864,
            ],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::OH,
        canonical_id: "OH",
        display_name: "Hydroxyl",
        aliases: &["hydroxyl radical"],
        fit: fit(
            [
                3.99201543,
                -2.40131752e-3,
                4.61793841e-6,
                -3.88113333e-9,
                1.3641147e-12,
                3.61508056e3,
                -0.103925458,
            ],
            [
                3.09288767,
                5.48429716e-4,
                1.26505228e-7,
                -8.79461556e-11,
                1.17412376e-14,
                3.858657e3,
                4.4766961,
            ],
        ),
    },
    SpeciesCatalogEntry {
        species: Species::O2,
        canonical_id: "O2",
        display_name: "Oxygen",
        aliases: &["oxygen"],
        fit: fit(
            [
                3.78245636,
                -2.99673416e-3,
                9.84730201e-6,
                -9.68129509e-9,
                3.24372837e-12,
                -1.06394356e3,
                3.65767573,
            ],
            [
                3.28253784,
                1.48308754e-3,
                -7.57966669e-7,
                2.09470555e-10,
                -2.16717794e-14,
                -1.08845772e3,
                5.45323129,
            ],
        ),
    },
];

pub fn species_catalog() -> &'static [SpeciesCatalogEntry] {
    &SPECIES_CATALOG
}

pub fn catalog_entry(species: Species) -> &'static SpeciesCatalogEntry {
    // The catalog is ordered like `Species::ALL`.
    &SPECIES_CATALOG[species as usize]
}

/// Built-in polynomial fit of `species`.
pub fn nasa7(species: Species) -> Nasa7 {
    catalog_entry(species).fit
}

pub fn filter_species_catalog(query: &str) -> Vec<&'static SpeciesCatalogEntry> {
    SPECIES_CATALOG
        .iter()
        .filter(|entry| entry.matches_query(query))
        .collect()
}

/// Resolve a species id or name, e.g. `"co2"` or `"Carbon Dioxide"`.
pub fn lookup_species(name: &str) -> ThermoResult<Species> {
    if let Ok(species) = name.parse::<Species>() {
        return Ok(species);
    }
    let query = name.trim().to_ascii_lowercase();
    SPECIES_CATALOG
        .iter()
        .find(|entry| {
            entry.display_name.to_ascii_lowercase() == query
                || entry.aliases.iter().any(|alias| *alias == query)
        })
        .map(|entry| entry.species)
        .ok_or_else(|| ThermoError::UnknownSpecies {
            name: name.to_string(),
        })
}

/// Ordered list of product species a solver instance is configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSet {
    name: String,
    species: Vec<Species>,
}

impl ProductSet {
    pub fn new(name: impl Into<String>, species: Vec<Species>) -> ThermoResult<Self> {
        if species.is_empty() {
            return Err(ThermoError::InvalidArg {
                what: "product set must contain at least one species",
            });
        }
        for (i, s) in species.iter().enumerate() {
            if species[..i].contains(s) {
                return Err(ThermoError::InvalidArg {
                    what: "duplicate species in product set",
                });
            }
        }
        Ok(Self {
            name: name.into(),
            species,
        })
    }

    /// Dry-air products: Ar, carbon oxides and the N/O family.
    pub fn air() -> Self {
        use Species::*;
        Self {
            name: "air".to_string(),
            species: vec![Ar, CO, CO2, N, NO, NO2, O, O2, N2],
        }
    }

    /// Air products plus the hydrogen-bearing species of hydrocarbon combustion.
    pub fn air_hydrocarbon() -> Self {
        use Species::*;
        Self {
            name: "air_hydrocarbon".to_string(),
            species: vec![Ar, CO, CO2, H, H2, H2O, N, NO, NO2, O, OH, O2, N2],
        }
    }

    /// Built-in set by name (`air`, `air_hydrocarbon`).
    pub fn by_name(name: &str) -> ThermoResult<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "air" => Ok(Self::air()),
            "air_hydrocarbon" | "air_fuel" => Ok(Self::air_hydrocarbon()),
            _ => Err(ThermoError::InvalidArg {
                what: "unknown product set (expected 'air' or 'air_hydrocarbon')",
            }),
        }
    }

    /// Custom set from species ids.
    pub fn from_keys<S: AsRef<str>>(name: impl Into<String>, keys: &[S]) -> ThermoResult<Self> {
        let species = keys
            .iter()
            .map(|k| lookup_species(k.as_ref()))
            .collect::<ThermoResult<Vec<_>>>()?;
        Self::new(name, species)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_ordered_like_species_enum() {
        for (entry, species) in species_catalog().iter().zip(Species::ALL) {
            assert_eq!(entry.species, species);
            assert_eq!(entry.canonical_id, species.key());
        }
    }

    #[test]
    fn lookup_by_alias_and_display_name() {
        assert_eq!(lookup_species("steam").unwrap(), Species::H2O);
        assert_eq!(lookup_species("Carbon Dioxide").unwrap(), Species::CO2);
        assert_eq!(lookup_species("o2").unwrap(), Species::O2);
        assert!(matches!(
            lookup_species("unobtainium"),
            Err(ThermoError::UnknownSpecies { .. })
        ));
    }

    #[test]
    fn filter_matches_partial_names() {
        let hits = filter_species_catalog("nitr");
        assert!(hits.iter().any(|e| e.species == Species::N2));
        assert!(hits.iter().any(|e| e.species == Species::NO));
        assert!(!hits.iter().any(|e| e.species == Species::Ar));
        assert_eq!(filter_species_catalog("").len(), Species::ALL.len());
    }

    #[test]
    fn predefined_product_sets() {
        assert_eq!(ProductSet::air().len(), 9);
        assert_eq!(ProductSet::air_hydrocarbon().len(), 13);
        assert_eq!(ProductSet::by_name("Air-Hydrocarbon").unwrap().name(), "air_hydrocarbon");
        assert!(ProductSet::by_name("kerosene").is_err());
    }

    #[test]
    fn product_set_rejects_duplicates() {
        let result = ProductSet::from_keys("dup", &["N2", "nitrogen"]);
        assert!(result.is_err());
        let ok = ProductSet::from_keys("n", &["N2", "N"]).unwrap();
        assert_eq!(ok.species(), &[Species::N2, Species::N]);
    }
}
