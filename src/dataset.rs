//! # Dataset Interface
//!
//! The converter never talks to libnetcdf directly. It consumes an opened
//! archive through the [`Dataset`] trait, which exposes dimensions, ordered data
//! variables, coordinate variables and the flat global attributes.
//!
//! Coordinate classification follows the netCDF/CF conventions and is shared by
//! every implementation through [`Catalog`]:
//!
//! - a variable named after its only dimension is a coordinate variable
//! - a variable listed in another variable's `coordinates` attribute is one too
//! - every other variable is a data variable
//!
//! Dimensions are taken from the variables rather than from the file's
//! dimension table: a dimension no variable uses is not part of the archive's
//! structure, and the string-length dimension of a character array is folded
//! into its elements by the loader.
//!
//! [`MemoryDataset`] is an in-memory implementation used to build archives
//! programmatically.

use crate::error::{Nc2JsonError, Nc2JsonResult};
use crate::value::{ArrayData, FieldValue};

/// Read access to an opened archive.
pub trait Dataset {
    /// Dimension names in order of first use by a variable.
    fn dimensions(&self) -> Vec<String>;

    /// Coordinate variables attached to the lookup of `dimension`.
    ///
    /// An empty result classifies the dimension as "without coords".
    fn coordinates_of(&self, dimension: &str) -> Vec<String>;

    /// Data variable names in file order.
    fn data_variable_names(&self) -> Vec<String>;

    /// Coordinate variable names in file order.
    fn coordinate_names(&self) -> Vec<String>;

    /// Reads any variable, coordinate or data, by name.
    fn read_variable(&self, name: &str) -> Nc2JsonResult<ArrayData>;

    /// Global attributes in file order.
    fn attributes(&self) -> Nc2JsonResult<Vec<(String, FieldValue)>>;
}

/// Name and dimension names of one variable, as seen after loading
/// (character arrays have already lost their string-length dimension).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableLayout {
    pub name: String,
    pub dimensions: Vec<String>,
}

impl VariableLayout {
    pub fn new(name: &str, dimensions: &[&str]) -> Self {
        VariableLayout {
            name: name.to_string(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn is_dimension_coordinate(&self) -> bool {
        self.dimensions.len() == 1 && self.dimensions[0] == self.name
    }
}

/// Structural view of an archive: dimensions, variable layouts and the
/// resulting coordinate/data split.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    dimensions: Vec<String>,
    variables: Vec<VariableLayout>,
    coordinates: Vec<String>,
}

impl Catalog {
    /// Builds the catalog; `references` are the names collected from
    /// `coordinates` attributes (unknown names are ignored).
    pub fn new(variables: Vec<VariableLayout>, references: &[String]) -> Self {
        let mut dimensions: Vec<String> = Vec::new();
        for dim in variables.iter().flat_map(|v| &v.dimensions) {
            if !dimensions.contains(dim) {
                dimensions.push(dim.clone());
            }
        }

        let coordinates = variables
            .iter()
            .filter(|v| v.is_dimension_coordinate() || references.contains(&v.name))
            .map(|v| v.name.clone())
            .collect();

        Catalog {
            dimensions,
            variables,
            coordinates,
        }
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn layout(&self, name: &str) -> Option<&VariableLayout> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn is_coordinate(&self, name: &str) -> bool {
        self.coordinates.iter().any(|c| c == name)
    }

    pub fn coordinate_names(&self) -> Vec<String> {
        self.coordinates.clone()
    }

    pub fn data_variable_names(&self) -> Vec<String> {
        self.variables
            .iter()
            .filter(|v| !self.is_coordinate(&v.name))
            .map(|v| v.name.clone())
            .collect()
    }

    /// Coordinates whose dimensions all belong to the lookup of `dimension`:
    /// the variable of that name if one exists, the bare dimension otherwise.
    pub fn coordinates_of(&self, dimension: &str) -> Vec<String> {
        let lookup: Vec<String> = match self.layout(dimension) {
            Some(layout) => layout.dimensions.clone(),
            None => vec![dimension.to_string()],
        };

        self.coordinates
            .iter()
            .filter_map(|name| self.layout(name))
            .filter(|coord| coord.dimensions.iter().all(|d| lookup.contains(d)))
            .map(|coord| coord.name.clone())
            .collect()
    }
}

/// Splits a CF `coordinates` attribute into variable names.
pub fn parse_coordinates_attribute(value: &str) -> Vec<String> {
    value.split_whitespace().map(|s| s.to_string()).collect()
}

/// An archive held entirely in memory.
///
/// # Examples
///
/// ```rust
/// use nc2json::dataset::{Dataset, MemoryDataset};
/// use nc2json::value::ArrayData;
///
/// let ds = MemoryDataset::new()
///     .with_variable("TIME", &["TIME"], ArrayData::floats(vec![0.0, 1.0, 2.0]))
///     .with_variable("TEMP", &["TIME"], ArrayData::floats(vec![12.1, 12.3, 12.2]));
///
/// assert_eq!(ds.coordinate_names(), vec!["TIME"]);
/// assert_eq!(ds.data_variable_names(), vec!["TEMP"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    variables: Vec<(VariableLayout, ArrayData)>,
    references: Vec<String>,
    attributes: Vec<(String, FieldValue)>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: &str, dimensions: &[&str], data: ArrayData) -> Self {
        self.variables.push((VariableLayout::new(name, dimensions), data));
        self
    }

    /// Marks `name` as an auxiliary coordinate, as a `coordinates` attribute would.
    pub fn with_coordinate_reference(mut self, name: &str) -> Self {
        self.references.push(name.to_string());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: FieldValue) -> Self {
        self.attributes.push((name.to_string(), value));
        self
    }

    fn catalog(&self) -> Catalog {
        Catalog::new(
            self.variables.iter().map(|(layout, _)| layout.clone()).collect(),
            &self.references,
        )
    }
}

impl Dataset for MemoryDataset {
    fn dimensions(&self) -> Vec<String> {
        self.catalog().dimensions().to_vec()
    }

    fn coordinates_of(&self, dimension: &str) -> Vec<String> {
        self.catalog().coordinates_of(dimension)
    }

    fn data_variable_names(&self) -> Vec<String> {
        self.catalog().data_variable_names()
    }

    fn coordinate_names(&self) -> Vec<String> {
        self.catalog().coordinate_names()
    }

    fn read_variable(&self, name: &str) -> Nc2JsonResult<ArrayData> {
        self.variables
            .iter()
            .find(|(layout, _)| layout.name == name)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| Nc2JsonError::MissingVariable(name.to_string()))
    }

    fn attributes(&self) -> Nc2JsonResult<Vec<(String, FieldValue)>> {
        Ok(self.attributes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glider_layout() -> Catalog {
        Catalog::new(
            vec![
                VariableLayout::new("TIME", &["TIME"]),
                VariableLayout::new("LATITUDE", &["TIME"]),
                VariableLayout::new("TEMP", &["TIME"]),
                VariableLayout::new("TIME_GPS", &["TIME_GPS"]),
                VariableLayout::new("LATITUDE_GPS", &["TIME_GPS"]),
                VariableLayout::new("PLATFORM_TYPE", &[]),
                VariableLayout::new("SENSOR", &["N_PARAM"]),
            ],
            &parse_coordinates_attribute("TIME LATITUDE"),
        )
    }

    #[test]
    fn test_coordinate_split() {
        let catalog = glider_layout();
        assert_eq!(catalog.coordinate_names(), vec!["TIME", "LATITUDE", "TIME_GPS"]);
        assert_eq!(
            catalog.data_variable_names(),
            vec!["TEMP", "LATITUDE_GPS", "PLATFORM_TYPE", "SENSOR"]
        );
    }

    #[test]
    fn test_dimensions_in_first_use_order() {
        let catalog = glider_layout();
        assert_eq!(catalog.dimensions().to_vec(), vec!["TIME", "TIME_GPS", "N_PARAM"]);
    }

    #[test]
    fn test_coordinates_of_dimension_with_variable() {
        let catalog = glider_layout();
        assert_eq!(catalog.coordinates_of("TIME"), vec!["TIME", "LATITUDE"]);
        assert_eq!(catalog.coordinates_of("TIME_GPS"), vec!["TIME_GPS"]);
    }

    #[test]
    fn test_coordinates_of_bare_dimension() {
        let catalog = glider_layout();
        assert!(catalog.coordinates_of("N_PARAM").is_empty());
    }

    #[test]
    fn test_dimensionless_coordinate_matches_every_dimension() {
        // TRAJECTORY(STRING64) once its characters are collapsed
        let catalog = Catalog::new(
            vec![
                VariableLayout::new("TRAJECTORY", &[]),
                VariableLayout::new("TEMP", &["TIME"]),
                VariableLayout::new("SENSOR", &["N_PARAM"]),
            ],
            &parse_coordinates_attribute("TRAJECTORY"),
        );

        assert_eq!(catalog.dimensions().to_vec(), vec!["TIME", "N_PARAM"]);
        assert_eq!(catalog.coordinates_of("TIME"), vec!["TRAJECTORY"]);
        assert_eq!(catalog.coordinates_of("N_PARAM"), vec!["TRAJECTORY"]);
    }

    #[test]
    fn test_unknown_reference_is_ignored() {
        let catalog = Catalog::new(
            vec![VariableLayout::new("v", &["x"])],
            &parse_coordinates_attribute("lon lat"),
        );
        assert!(catalog.coordinate_names().is_empty());
        assert_eq!(catalog.data_variable_names(), vec!["v"]);
    }

    #[test]
    fn test_memory_dataset_lookup() {
        let ds = MemoryDataset::new().with_variable("TIME", &["TIME"], ArrayData::floats(vec![0.0, 1.0]));

        assert!(ds.read_variable("TIME").is_ok());
        assert!(matches!(
            ds.read_variable("PRES"),
            Err(Nc2JsonError::MissingVariable(_))
        ));
    }
}
