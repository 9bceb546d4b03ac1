use super::ParamName;
use std::collections::BTreeMap;

const CATEGORIES: &[(&str, &str)] = &[
    ("ACTC", "Additional Child Tax Credit"),
    ("AGI", "Adjusted Gross Income"),
    ("ALD", "Above-the-Line Deduction"),
    ("AMT", "Alternative Minimum Tax"),
    ("CDCC", "Child and Dependent Care Credit"),
    ("CG", "Capital Gains"),
    ("CTC", "Child Tax Credit"),
    ("DCC", "Dependent Care Credit"),
    ("EITC", "Earned Income Tax Credit"),
    ("ETC", "Education Tax Credit"),
    ("FICA", "Payroll Tax"),
    ("ID", "Itemized Deduction"),
    ("II", "Personal Income Tax"),
    ("KT", "Kiddie Tax"),
    ("LLC", "Lifetime Learning Credit"),
    ("NIIT", "Net Investment Income Tax"),
    ("PT", "Pass-Through Income"),
    ("SS", "Social Security"),
    ("STD", "Standard Deduction"),
];

const FUNCTIONS: &[(&str, &str)] = &[
    ("brk", "bracket top"),
    ("c", "ceiling"),
    ("crt", "ceiling rate"),
    ("em", "exemption amount"),
    ("f", "floor"),
    ("frt", "floor rate"),
    ("hc", "haircut"),
    ("pe", "phase-out end"),
    ("prt", "phase-out rate"),
    ("ps", "phase-out start"),
    ("rt", "rate"),
    ("thd", "threshold"),
    ("thde", "threshold end"),
    ("thds", "threshold start"),
];

const QUALIFIERS: &[(&str, &str)] = &[
    ("HeadHouse", "head of household"),
    ("MarriedJ", "married filing jointly"),
    ("MarriedS", "married filing separately"),
    ("Single", "single"),
    ("Widow", "surviving spouse"),
];

/// Abbreviation tables used to explain parameter names
#[derive(Debug, Clone)]
pub struct Glossary {
    categories: BTreeMap<String, String>,
    functions: BTreeMap<String, String>,
    qualifiers: BTreeMap<String, String>,
}

impl Default for Glossary {
    fn default() -> Self {
        fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }
        Glossary {
            categories: table(CATEGORIES),
            functions: table(FUNCTIONS),
            qualifiers: table(QUALIFIERS),
        }
    }
}

impl Glossary {
    pub fn category(&self, abbrev: &str) -> Option<&str> {
        self.categories.get(abbrev).map(String::as_str)
    }

    pub fn function(&self, abbrev: &str) -> Option<&str> {
        self.functions.get(abbrev).map(String::as_str)
    }

    pub fn qualifier(&self, abbrev: &str) -> Option<&str> {
        self.qualifiers.get(abbrev).map(String::as_str)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &str)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Human readable meaning of a parameter name. Unknown abbreviations
    /// are kept verbatim.
    pub fn describe(&self, name: &ParamName) -> String {
        let mut out = self.category(&name.category).unwrap_or(&name.category).to_string();
        for sub in &name.subcategory {
            out.push_str(", ");
            out.push_str(self.category(sub).unwrap_or(sub));
        }
        out.push_str(": ");
        out.push_str(self.function(&name.function).unwrap_or(&name.function));
        if let Some(bracket) = name.bracket {
            out.push_str(&format!(", bracket {}", bracket));
        }
        if let Some(qualifier) = &name.qualifier {
            let text = self.qualifier(qualifier).unwrap_or(qualifier);
            out.push_str(&format!(" ({})", text));
        }
        if name.indexing_flag {
            out = format!("indexing flag for {}", out);
        }
        out
    }
}
