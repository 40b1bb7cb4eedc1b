//! Source table layout for each nation.
//!
//! The schema says where the boundary layer and the count tables live under
//! the data directory and which columns hold which counts. It is plain data:
//! `Schema::census_2011` is the layout of the 2011 UK census downloads, and any
//! other layout can be loaded from JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};
use crate::seeds::{ETHNIC_GROUP_SEED, QUALIFICATION_SEED};

/// One of the four independently processed partitions of the UK.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Nation {
    #[serde(rename = "E")]
    England,
    #[serde(rename = "N")]
    NorthernIreland,
    #[serde(rename = "S")]
    Scotland,
    #[serde(rename = "W")]
    Wales,
}

impl Nation {
    pub fn all() -> &'static [Nation] {
        &[
            Nation::England,
            Nation::NorthernIreland,
            Nation::Scotland,
            Nation::Wales,
        ]
    }

    /// Leading letter of every area code in this nation.
    pub fn letter(self) -> char {
        match self {
            Nation::England => 'E',
            Nation::NorthernIreland => 'N',
            Nation::Scotland => 'S',
            Nation::Wales => 'W',
        }
    }

    pub fn from_letter(letter: char) -> Result<Self> {
        match letter.to_ascii_uppercase() {
            'E' => Ok(Nation::England),
            'N' => Ok(Nation::NorthernIreland),
            'S' => Ok(Nation::Scotland),
            'W' => Ok(Nation::Wales),
            _ => Err(SynthError::UnknownNation(letter)),
        }
    }

    /// File stem of the nation's population table.
    pub fn name(self) -> &'static str {
        match self {
            Nation::England => "england",
            Nation::NorthernIreland => "northern_ireland",
            Nation::Scotland => "scotland",
            Nation::Wales => "wales",
        }
    }

    /// Prefix of output-area codes, which sets them apart from the nation-wide
    /// and council-level summary rows some tables carry.
    pub fn area_prefix(self) -> String {
        format!("{}0", self.letter())
    }

    /// Whether a boundary or index code belongs to this nation.
    pub fn owns_code(self, code: &str) -> bool {
        code.starts_with(self.letter())
    }
}

impl std::fmt::Display for Nation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Where the area code of a count row is found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaIndex {
    /// A named column, e.g. `GeographyCode`.
    Column(String),
    /// The unnamed first column.
    FirstColumn,
}

/// A count table: one CSV file, or several matched by a `*` file pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSource {
    /// Directory components below the data directory.
    pub dir: Vec<String>,
    /// File name, possibly containing `*` wildcards.
    pub file: String,
    pub index: AreaIndex,
}

impl CountSource {
    pub fn new(dir: &[&str], file: &str, index: AreaIndex) -> Self {
        Self {
            dir: dir.iter().map(|s| s.to_string()).collect(),
            file: file.to_string(),
            index,
        }
    }

    pub fn directory(&self, data_dir: &Path) -> PathBuf {
        self.dir.iter().fold(data_dir.to_path_buf(), |p, c| p.join(c))
    }
}

/// Total population per area.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationSource {
    pub source: CountSource,
    pub column: String,
}

/// The columns holding one category's count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Single(String),
    /// Summed, e.g. the five Asian sub-groups.
    Sum(Vec<String>),
}

impl FieldSpec {
    pub fn columns(&self) -> &[String] {
        match self {
            FieldSpec::Single(c) => std::slice::from_ref(c),
            FieldSpec::Sum(cs) => cs,
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(column: &str) -> Self {
        FieldSpec::Single(column.to_string())
    }
}

impl From<&[&str]> for FieldSpec {
    fn from(columns: &[&str]) -> Self {
        FieldSpec::Sum(columns.iter().map(|s| s.to_string()).collect())
    }
}

/// Sub-counts of one attribute for one nation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSource {
    pub source: CountSource,
    /// Keyed by category name.
    pub fields: BTreeMap<String, FieldSpec>,
}

/// A categorical attribute added as one column of the population table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSet {
    /// Name of the output column.
    pub column: String,
    /// Categories in label order. `other` is implicit.
    pub categories: Vec<String>,
    pub seed: u64,
    pub nations: BTreeMap<Nation, AttributeSource>,
}

impl AttributeSet {
    pub fn source(&self, nation: Nation) -> Result<&AttributeSource> {
        self.nations
            .get(&nation)
            .ok_or_else(|| SynthError::MissingSchemaEntry {
                what: self.column.clone(),
                nation: nation.letter(),
            })
    }

    /// Field specs of one nation in category order.
    pub fn fields(&self, nation: Nation) -> Result<Vec<&FieldSpec>> {
        let source = self.source(nation)?;
        self.categories
            .iter()
            .map(|cat| {
                source.fields.get(cat).ok_or_else(|| SynthError::MissingSchemaEntry {
                    what: format!("{}.{}", self.column, cat),
                    nation: nation.letter(),
                })
            })
            .collect()
    }
}

/// Polygon layer holding every area boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundarySource {
    /// Path components below the data directory.
    pub path: Vec<String>,
    /// Feature property holding the area code.
    pub code_field: String,
}

impl BoundarySource {
    pub fn resolve(&self, data_dir: &Path) -> PathBuf {
        self.path.iter().fold(data_dir.to_path_buf(), |p, c| p.join(c))
    }
}

/// Complete source layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub boundaries: BoundarySource,
    /// Processing order.
    pub nations: Vec<Nation>,
    pub population: BTreeMap<Nation, PopulationSource>,
    /// Applied in order.
    pub attributes: Vec<AttributeSet>,
}

impl Schema {
    /// Load a schema from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SynthError::io(path, e))?;
        let schema: Schema = serde_json::from_str(&text)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check that every nation has a population source and every attribute
    /// maps every category for every nation it covers.
    pub fn validate(&self) -> Result<()> {
        for &nation in &self.nations {
            self.population(nation)?;
        }
        for attr in &self.attributes {
            for &nation in attr.nations.keys() {
                attr.fields(nation)?;
            }
        }
        Ok(())
    }

    pub fn population(&self, nation: Nation) -> Result<&PopulationSource> {
        self.population
            .get(&nation)
            .ok_or_else(|| SynthError::MissingSchemaEntry {
                what: "population".to_string(),
                nation: nation.letter(),
            })
    }

    pub fn attribute(&self, column: &str) -> Option<&AttributeSet> {
        self.attributes.iter().find(|a| a.column == column)
    }

    /// Layout of the 2011 census downloads.
    pub fn census_2011() -> Self {
        let ew_population = &[
            "england_wales_population",
            "ks101ew_2011oa",
            "KS101EW_2011STATH_NAT_OA_REL_1.1.1",
        ];
        let geography_code = || AreaIndex::Column("GeographyCode".to_string());

        let mut population = BTreeMap::new();
        population.insert(
            Nation::England,
            PopulationSource {
                source: CountSource::new(ew_population, "KS101EWDATA01_*.CSV", geography_code()),
                column: "KS101EW0001".to_string(),
            },
        );
        population.insert(
            Nation::NorthernIreland,
            PopulationSource {
                source: CountSource::new(&["northern_ireland", "SMALL AREAS"], "KS101NIDATA0.CSV", geography_code()),
                column: "KS101NI0001".to_string(),
            },
        );
        population.insert(
            Nation::Scotland,
            PopulationSource {
                source: CountSource::new(&["scotland"], "QS101SC.csv", AreaIndex::FirstColumn),
                column: "All people".to_string(),
            },
        );
        population.insert(
            Nation::Wales,
            PopulationSource {
                source: CountSource::new(ew_population, "KS101EWDATA01_W.CSV", geography_code()),
                column: "KS101EW0001".to_string(),
            },
        );

        Self {
            boundaries: BoundarySource {
                path: vec![
                    "boundaries".to_string(),
                    "infuse_oa_lyr_2011_clipped.geojson".to_string(),
                ],
                code_field: "geo_code".to_string(),
            },
            nations: Nation::all().to_vec(),
            population,
            attributes: vec![qualification_2011(), ethnic_group_2011()],
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::census_2011()
    }
}

fn fields(pairs: &[(&str, FieldSpec)]) -> BTreeMap<String, FieldSpec> {
    pairs
        .iter()
        .map(|(cat, spec)| (cat.to_string(), spec.clone()))
        .collect()
}

fn qualification_2011() -> AttributeSet {
    let ew_dir = &[
        "england_wales_qualifications",
        "KS501ew_2011_oa",
        "KS501EW_2011STATH_NAT_OA_REL_1.3.3",
    ];
    let geography_code = || AreaIndex::Column("GeographyCode".to_string());
    let ew_fields = fields(&[
        ("none", "KS501EW0002".into()),
        ("level1", "KS501EW0003".into()),
        ("level2", "KS501EW0004".into()),
        ("level3", "KS501EW0006".into()),
        ("level4", "KS501EW0007".into()),
    ]);
    let scotland_prefix = "All people aged 16 and over: ";

    let mut nations = BTreeMap::new();
    nations.insert(
        Nation::England,
        AttributeSource {
            source: CountSource::new(ew_dir, "KS501EWDATA01_*.CSV", geography_code()),
            fields: ew_fields.clone(),
        },
    );
    nations.insert(
        Nation::NorthernIreland,
        AttributeSource {
            source: CountSource::new(&["northern_ireland", "SMALL AREAS"], "KS501NIDATA0.CSV", geography_code()),
            fields: fields(&[
                ("none", "KS501NI0002".into()),
                ("level1", "KS501NI0003".into()),
                ("level2", "KS501NI0004".into()),
                ("level3", "KS501NI0006".into()),
                ("level4", "KS501NI0007".into()),
            ]),
        },
    );
    nations.insert(
        Nation::Scotland,
        AttributeSource {
            source: CountSource::new(&["scotland"], "KS501SC.csv", AreaIndex::FirstColumn),
            fields: fields(&[
                ("none", FieldSpec::Single(format!("{scotland_prefix}No qualifications"))),
                ("level1", FieldSpec::Single(format!("{scotland_prefix}Highest level of qualification: Level 1 qualifications"))),
                ("level2", FieldSpec::Single(format!("{scotland_prefix}Highest level of qualification: Level 2 qualifications"))),
                ("level3", FieldSpec::Single(format!("{scotland_prefix}Highest level of qualification: Level 3 qualifications"))),
                ("level4", FieldSpec::Single(format!("{scotland_prefix}Highest level of qualification: Level 4 qualifications and above"))),
            ]),
        },
    );
    nations.insert(
        Nation::Wales,
        AttributeSource {
            source: CountSource::new(ew_dir, "KS501EWDATA01_W.CSV", geography_code()),
            fields: ew_fields,
        },
    );

    AttributeSet {
        column: "highest_qualification".to_string(),
        categories: ["none", "level1", "level2", "level3", "level4"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        seed: QUALIFICATION_SEED,
        nations,
    }
}

fn ethnic_group_2011() -> AttributeSet {
    let ew_dir = &[
        "england_wales_ethnic_group",
        "KS201ew_2011_oa",
        "KS201EW_2011STATH_NAT_OA_REL_1.3.3",
    ];
    let geography_code = || AreaIndex::Column("GeographyCode".to_string());
    let ew_fields = fields(&[
        ("asian", FieldSpec::from(&["KS201EW0010", "KS201EW0011", "KS201EW0012", "KS201EW0013", "KS201EW0014"][..])),
        ("black", FieldSpec::from(&["KS201EW0015", "KS201EW0016", "KS201EW0017"][..])),
        ("mixed", FieldSpec::from(&["KS201EW0006", "KS201EW0007", "KS201EW0008", "KS201EW0009"][..])),
        ("white", FieldSpec::from(&["KS201EW0002", "KS201EW0003", "KS201EW0004", "KS201EW0005"][..])),
    ]);

    let mut nations = BTreeMap::new();
    nations.insert(
        Nation::England,
        AttributeSource {
            source: CountSource::new(ew_dir, "KS201EWDATA01_*.CSV", geography_code()),
            fields: ew_fields.clone(),
        },
    );
    nations.insert(
        Nation::NorthernIreland,
        AttributeSource {
            source: CountSource::new(&["northern_ireland", "SMALL AREAS"], "KS201NIDATA0.CSV", geography_code()),
            fields: fields(&[
                ("asian", FieldSpec::from(&["KS201NI0003", "KS201NI0005", "KS201NI0006", "KS201NI0007", "KS201NI0008"][..])),
                ("black", FieldSpec::from(&["KS201NI0009", "KS201NI0010", "KS201NI0011"][..])),
                ("mixed", "KS201NI0012".into()),
                ("white", FieldSpec::from(&["KS201NI0002", "KS201NI0004"][..])),
            ]),
        },
    );
    nations.insert(
        Nation::Scotland,
        AttributeSource {
            source: CountSource::new(&["scotland"], "KS201SC.csv", AreaIndex::FirstColumn),
            fields: fields(&[
                ("asian", "Asian, Asian Scottish or Asian British".into()),
                ("black", "African".into()),
                ("mixed", "Mixed or multiple ethnic groups".into()),
                ("white", "White".into()),
            ]),
        },
    );
    nations.insert(
        Nation::Wales,
        AttributeSource {
            source: CountSource::new(ew_dir, "KS201EWDATA01_W.CSV", geography_code()),
            fields: ew_fields,
        },
    );

    AttributeSet {
        column: "ethnic_group".to_string(),
        categories: ["asian", "black", "mixed", "white"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        seed: ETHNIC_GROUP_SEED,
        nations,
    }
}
