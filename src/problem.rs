use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The type used for cost
pub type Cost = f64;
/// The type used for demand, capacity and flow quantities
pub type Quantity = f64;

pub type LocationIndex = usize;
pub type SizeIndex = usize;

/// A rectangular table of reals keyed by row and column labels, in the shape
/// the input files come in: one row per location, one column per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Row labels, in file order
    pub index: Vec<String>,
    /// Column labels, in file order
    pub columns: Vec<String>,
    /// Cell values, one inner `Vec` per row
    pub values: Vec<Vec<f64>>,
}

impl Table {
    pub fn new(index: Vec<String>, columns: Vec<String>, values: Vec<Vec<f64>>) -> Table {
        Table {
            index,
            columns,
            values,
        }
    }

    /// The value at (`row`, `column`), or `None` if either label is unknown
    /// or the row is short.
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.index.iter().position(|name| name == row)?;
        let c = self.columns.iter().position(|name| name == column)?;
        self.values.get(r)?.get(c).copied()
    }
}

/// Perturbation applied to one cost table when sampling a trial. Every cell
/// is drawn independently as `cost + Normal(cost * bias, cost * relative_std_dev)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerturbationSpec {
    /// Multiplicative shift of the sampled mean
    pub bias: f64,
    /// Standard deviation relative to the nominal cost. Zero makes the draw
    /// deterministic.
    pub relative_std_dev: f64,
}

impl PerturbationSpec {
    pub fn new(bias: f64, relative_std_dev: f64) -> PerturbationSpec {
        PerturbationSpec {
            bias,
            relative_std_dev,
        }
    }
}

#[derive(Debug, Display)]
pub enum ProblemConstructionError {
    /// The fixed cost table contains no locations
    #[display(fmt = "the fixed cost table contains no locations")]
    NoLocations,
    /// The fixed cost table contains no size categories
    #[display(fmt = "the fixed cost table contains no size categories")]
    NoSizeCategories,
    /// The same location occurs twice in the fixed cost table
    #[display(fmt = "duplicate location {}", _0)]
    DuplicateLocation(String),
    /// A table references a location with no fixed cost entry
    #[display(fmt = "table {} references unknown location {}", table, location)]
    UnknownLocation {
        table: &'static str,
        location: String,
    },
    /// The capacity table references a size category with no fixed cost entry
    #[display(fmt = "capacity table references unknown size category {}", _0)]
    UnknownSizeCategory(String),
    /// No transport cost between a pair of locations
    #[display(fmt = "missing variable cost from {} to {}", origin, destination)]
    MissingVariableCost { origin: String, destination: String },
    /// A location has no demand entry
    #[display(fmt = "missing demand for location {}", _0)]
    MissingDemand(String),
    /// A (location, size category) pair has no capacity entry
    #[display(fmt = "missing capacity for location {} size {}", location, size)]
    MissingCapacity { location: String, size: String },
    /// The demand table has no value column
    #[display(fmt = "the demand table has no value column")]
    NoDemandColumn,
    /// A short row in the fixed cost table
    #[display(fmt = "missing fixed cost for location {} size {}", location, size)]
    MissingFixedCost { location: String, size: String },
    /// Costs, demands and capacities must all be non-negative
    #[display(fmt = "negative value in table {} at ({}, {})", table, row, column)]
    NegativeValue {
        table: &'static str,
        row: String,
        column: String,
    },
}

impl std::error::Error for ProblemConstructionError {}

/// A validated instance of the capacitated plant location problem: the
/// location and size category universes together with the nominal fixed
/// cost, transport cost, demand and capacity tables in dense index form.
///
/// Construction checks that all four tables agree on the location universe,
/// so everything downstream can assume a consistent instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// The locations, in fixed cost table order. Each location is both a
    /// candidate production site and a demand region.
    locations: Vec<String>,
    /// The plant size categories, in fixed cost table column order
    size_categories: Vec<String>,
    /// Fixed cost of opening a plant, by (location, size category)
    fixed_costs: Vec<Vec<Cost>>,
    /// Unit transport cost, by (origin, destination)
    variable_costs: Vec<Vec<Cost>>,
    /// Demand by location
    demands: Vec<Quantity>,
    /// Plant capacity, by (location, size category)
    capacities: Vec<Vec<Quantity>>,
}

impl Problem {
    pub fn new(
        fix_cost: &Table,
        var_cost: &Table,
        demand: &Table,
        capacity: &Table,
    ) -> Result<Problem, ProblemConstructionError> {
        use ProblemConstructionError::*;

        // The fixed cost table defines the location and size universes, as
        // every location must be a candidate site.
        let locations = fix_cost.index.clone();
        let size_categories = fix_cost.columns.clone();

        if locations.is_empty() {
            return Err(NoLocations);
        }

        if size_categories.is_empty() {
            return Err(NoSizeCategories);
        }

        let mut seen = HashSet::new();
        for location in &locations {
            if !seen.insert(location.as_str()) {
                return Err(DuplicateLocation(location.clone()));
            }
        }

        // Any row (or column, for transport costs) keyed by a location the
        // fixed cost table does not know is a mismatch between the tables.
        for (table, labels) in [
            ("varcosts", &var_cost.index),
            ("varcosts", &var_cost.columns),
            ("demand", &demand.index),
            ("capacity", &capacity.index),
        ] {
            if let Some(unknown) = labels.iter().find(|name| !seen.contains(name.as_str())) {
                return Err(UnknownLocation {
                    table,
                    location: unknown.clone(),
                });
            }
        }

        if let Some(unknown) = capacity
            .columns
            .iter()
            .find(|size| !size_categories.contains(size))
        {
            return Err(UnknownSizeCategory(unknown.clone()));
        }

        let demand_column = demand.columns.first().ok_or(NoDemandColumn)?;

        let fixed_costs = locations
            .iter()
            .map(|i| {
                size_categories
                    .iter()
                    .map(|s| {
                        fix_cost.get(i, s).ok_or_else(|| MissingFixedCost {
                            location: i.clone(),
                            size: s.clone(),
                        })
                    })
                    .collect()
            })
            .collect::<Result<Vec<Vec<f64>>, _>>()?;

        let variable_costs = locations
            .iter()
            .map(|i| {
                locations
                    .iter()
                    .map(|j| {
                        var_cost.get(i, j).ok_or_else(|| MissingVariableCost {
                            origin: i.clone(),
                            destination: j.clone(),
                        })
                    })
                    .collect()
            })
            .collect::<Result<Vec<Vec<f64>>, _>>()?;

        let demands = locations
            .iter()
            .map(|j| {
                demand
                    .get(j, demand_column)
                    .ok_or_else(|| MissingDemand(j.clone()))
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let capacities = locations
            .iter()
            .map(|i| {
                size_categories
                    .iter()
                    .map(|s| {
                        capacity.get(i, s).ok_or_else(|| MissingCapacity {
                            location: i.clone(),
                            size: s.clone(),
                        })
                    })
                    .collect()
            })
            .collect::<Result<Vec<Vec<f64>>, _>>()?;

        let tables: [(&'static str, &Vec<Vec<f64>>, &Vec<String>); 3] = [
            ("fixcosts", &fixed_costs, &size_categories),
            ("varcosts", &variable_costs, &locations),
            ("capacity", &capacities, &size_categories),
        ];
        for (table, values, columns) in tables {
            for (r, row) in values.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    if *value < 0.0 {
                        return Err(NegativeValue {
                            table,
                            row: locations[r].clone(),
                            column: columns[c].clone(),
                        });
                    }
                }
            }
        }

        if let Some(j) = demands.iter().position(|d| *d < 0.0) {
            return Err(NegativeValue {
                table: "demand",
                row: locations[j].clone(),
                column: demand_column.clone(),
            });
        }

        Ok(Problem {
            locations,
            size_categories,
            fixed_costs,
            variable_costs,
            demands,
            capacities,
        })
    }

    /// The locations, in input order (continuous indices starting at 0)
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// The plant size categories, in input order
    pub fn size_categories(&self) -> &[String] {
        &self.size_categories
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn size_count(&self) -> usize {
        self.size_categories.len()
    }

    /// Nominal fixed cost of opening a plant of size `s` at location `i`
    pub fn fixed_cost(&self, i: LocationIndex, s: SizeIndex) -> Cost {
        self.fixed_costs[i][s]
    }

    /// Nominal unit cost of transporting from location `i` to location `j`
    pub fn variable_cost(&self, i: LocationIndex, j: LocationIndex) -> Cost {
        self.variable_costs[i][j]
    }

    /// Demand at location `j`
    pub fn demand(&self, j: LocationIndex) -> Quantity {
        self.demands[j]
    }

    /// Capacity of a plant of size `s` at location `i`
    pub fn capacity(&self, i: LocationIndex, s: SizeIndex) -> Quantity {
        self.capacities[i][s]
    }

    /// The index of the location with the given name
    pub fn location_index(&self, name: &str) -> Option<LocationIndex> {
        self.locations.iter().position(|l| l == name)
    }
}
