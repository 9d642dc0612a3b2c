use std::path::{Path, PathBuf};
use std::sync::Arc;

use derive_more::{Display, From};
use log::debug;

use crate::problem::{Problem, ProblemConstructionError, Table};

#[derive(Debug, Display, From)]
pub enum LoadError {
    Io(std::io::Error),
    Csv(csv::Error),
    /// A cell that does not parse as a real number
    #[display(fmt = "bad number {:?} in row {} of {}", value, row, file)]
    #[from(ignore)]
    BadNumber {
        file: String,
        row: usize,
        value: String,
    },
    /// The tables do not form a consistent problem
    Problem(ProblemConstructionError),
}

impl std::error::Error for LoadError {}

/// Reads one `;`-separated table: the first column holds the location key,
/// the remaining header fields name the columns. Decimal commas are
/// normalized before parsing, as some of the shipped tables use locale
/// formatting.
pub fn read_table(path: &Path) -> Result<Table, LoadError> {
    debug!("reading table {}", path.display());

    let file = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .skip(1)
        .map(|s| s.to_string())
        .collect();

    let mut index = Vec::new();
    let mut values = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // +2: rows are 1-based and the header is row 1
        let row = i + 2;

        let mut fields = record.iter();
        index.push(fields.next().unwrap_or_default().to_string());
        values.push(
            fields
                .map(|field| parse_number(field, &file, row))
                .collect::<Result<Vec<f64>, LoadError>>()?,
        );
    }

    Ok(Table::new(index, columns, values))
}

fn parse_number(field: &str, file: &str, row: usize) -> Result<f64, LoadError> {
    field
        .replace(',', ".")
        .parse()
        .map_err(|_| LoadError::BadNumber {
            file: file.to_string(),
            row,
            value: field.to_string(),
        })
}

/// Loads the four tables a data directory ships and assembles them into a
/// validated problem.
pub fn load_problem(dir: &Path) -> Result<Problem, LoadError> {
    let fix_cost = read_table(&dir.join("fixcosts.csv"))?;
    let var_cost = read_table(&dir.join("varcosts.csv"))?;
    let demand = read_table(&dir.join("demand.csv"))?;
    let capacity = read_table(&dir.join("capacity.csv"))?;

    Ok(Problem::new(&fix_cost, &var_cost, &demand, &capacity)?)
}

/// Owns the problem loaded from a data directory, so repeated runs against
/// the same inputs parse them once. Invalidation drops the cached instance;
/// the next access reloads from disk.
#[derive(Debug)]
pub struct DataCache {
    dir: PathBuf,
    cached: Option<Arc<Problem>>,
}

impl DataCache {
    pub fn new(dir: impl Into<PathBuf>) -> DataCache {
        DataCache {
            dir: dir.into(),
            cached: None,
        }
    }

    /// The cached problem, loading it on first use
    pub fn problem(&mut self) -> Result<Arc<Problem>, LoadError> {
        if let Some(problem) = &self.cached {
            return Ok(problem.clone());
        }

        let problem = Arc::new(load_problem(&self.dir)?);
        self.cached = Some(problem.clone());
        Ok(problem)
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
