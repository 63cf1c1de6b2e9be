//! Chemical species definitions.

use crate::element::Element;

/// Gas-phase species relevant for air and hydrocarbon combustion products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Species {
    /// Argon (Ar)
    Ar,
    /// Methane (CH₄), reactant only in the built-in product sets
    CH4,
    /// Carbon monoxide (CO)
    CO,
    /// Carbon dioxide (CO₂)
    CO2,
    /// Atomic hydrogen (H)
    H,
    /// Hydrogen (H₂)
    H2,
    /// Water (H₂O)
    H2O,
    /// Atomic nitrogen (N)
    N,
    /// Nitric oxide (NO)
    NO,
    /// Nitrogen dioxide (NO₂)
    NO2,
    /// Nitrogen (N₂)
    N2,
    /// Atomic oxygen (O)
    O,
    /// Hydroxyl (OH)
    OH,
    /// Oxygen (O₂)
    O2,
}

impl Species {
    pub const ALL: [Species; 14] = [
        Species::Ar,
        Species::CH4,
        Species::CO,
        Species::CO2,
        Species::H,
        Species::H2,
        Species::H2O,
        Species::N,
        Species::NO,
        Species::NO2,
        Species::N2,
        Species::O,
        Species::OH,
        Species::O2,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Species::Ar => "Ar",
            Species::CH4 => "CH4",
            Species::CO => "CO",
            Species::CO2 => "CO2",
            Species::H => "H",
            Species::H2 => "H2",
            Species::H2O => "H2O",
            Species::N => "N",
            Species::NO => "NO",
            Species::NO2 => "NO2",
            Species::N2 => "N2",
            Species::O => "O",
            Species::OH => "OH",
            Species::O2 => "O2",
        }
    }

    /// Get human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Species::Ar => "Argon",
            Species::CH4 => "Methane",
            Species::CO => "Carbon Monoxide",
            Species::CO2 => "Carbon Dioxide",
            Species::H => "Atomic Hydrogen",
            Species::H2 => "Hydrogen",
            Species::H2O => "Water",
            Species::N => "Atomic Nitrogen",
            Species::NO => "Nitric Oxide",
            Species::NO2 => "Nitrogen Dioxide",
            Species::N2 => "Nitrogen",
            Species::O => "Atomic Oxygen",
            Species::OH => "Hydroxyl",
            Species::O2 => "Oxygen",
        }
    }

    /// Atoms per molecule, one entry per element present.
    pub fn atoms(&self) -> &'static [(Element, u32)] {
        use Element::*;
        match self {
            Species::Ar => &[(Ar, 1)],
            Species::CH4 => &[(C, 1), (H, 4)],
            Species::CO => &[(C, 1), (O, 1)],
            Species::CO2 => &[(C, 1), (O, 2)],
            Species::H => &[(H, 1)],
            Species::H2 => &[(H, 2)],
            Species::H2O => &[(H, 2), (O, 1)],
            Species::N => &[(N, 1)],
            Species::NO => &[(N, 1), (O, 1)],
            Species::NO2 => &[(N, 1), (O, 2)],
            Species::N2 => &[(N, 2)],
            Species::O => &[(O, 1)],
            Species::OH => &[(H, 1), (O, 1)],
            Species::O2 => &[(O, 2)],
        }
    }

    /// Number of `element` atoms in one molecule.
    pub fn atom_count(&self, element: Element) -> u32 {
        self.atoms()
            .iter()
            .find(|(e, _)| *e == element)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Molar mass [g/mol], summed from the atomic masses.
    pub fn molar_mass(&self) -> f64 {
        self.atoms()
            .iter()
            .map(|(element, count)| element.atomic_mass() * f64::from(*count))
            .sum()
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Species {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AR" | "ARGON" => Ok(Species::Ar),
            "CH4" | "METHANE" => Ok(Species::CH4),
            "CO" | "CARBONMONOXIDE" | "CARBON MONOXIDE" => Ok(Species::CO),
            "CO2" | "CARBONDIOXIDE" | "CARBON DIOXIDE" => Ok(Species::CO2),
            "H" => Ok(Species::H),
            "H2" | "HYDROGEN" => Ok(Species::H2),
            "H2O" | "WATER" => Ok(Species::H2O),
            "N" => Ok(Species::N),
            "NO" | "NITRICOXIDE" | "NITRIC OXIDE" => Ok(Species::NO),
            "NO2" | "NITROGENDIOXIDE" | "NITROGEN DIOXIDE" => Ok(Species::NO2),
            "N2" | "NITROGEN" => Ok(Species::N2),
            "O" => Ok(Species::O),
            "OH" | "HYDROXYL" => Ok(Species::OH),
            "O2" | "OXYGEN" => Ok(Species::O2),
            _ => Err("unknown species"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_from_str() {
        for species in Species::ALL {
            assert_eq!(species.key().parse::<Species>(), Ok(species));
        }
    }

    #[test]
    fn molar_masses_match_reference_values() {
        assert!((Species::N2.molar_mass() - 28.014).abs() < 1e-3);
        assert!((Species::O2.molar_mass() - 31.998).abs() < 1e-3);
        assert!((Species::CO2.molar_mass() - 44.009).abs() < 1e-3);
        assert!((Species::H2O.molar_mass() - 18.015).abs() < 1e-3);
    }

    #[test]
    fn atom_counts() {
        assert_eq!(Species::CO2.atom_count(Element::O), 2);
        assert_eq!(Species::CO2.atom_count(Element::C), 1);
        assert_eq!(Species::CO2.atom_count(Element::N), 0);
        assert_eq!(Species::CH4.atom_count(Element::H), 4);
    }
}
