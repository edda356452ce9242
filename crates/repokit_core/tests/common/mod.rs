#![allow(dead_code)]

use repokit_core::{Entity, Predicate, Row, SessionOptions, UnitOfWork, Value};
use std::path::Path;

pub const SCHEMA: &str = "
CREATE TABLE employees (
    id INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email_address TEXT NOT NULL,
    job_title TEXT NOT NULL
);
CREATE TABLE currency_rates (
    id INTEGER PRIMARY KEY,
    from_currency TEXT NOT NULL,
    to_currency TEXT NOT NULL,
    average_rate REAL NOT NULL
);
";

#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub job_title: String,
}

impl Employee {
    pub fn new(first_name: &str, last_name: &str, email_address: &str, job_title: &str) -> Self {
        Self {
            id: None,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email_address: email_address.to_string(),
            job_title: job_title.to_string(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

impl Entity for Employee {
    const TABLE: &'static str = "employees";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] =
        &["first_name", "last_name", "email_address", "job_title"];

    fn key(&self) -> Option<Value> {
        self.id.map(Value::Integer)
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.first_name.clone()),
            Value::Text(self.last_name.clone()),
            Value::Text(self.email_address.clone()),
            Value::Text(self.job_title.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            email_address: row.get("email_address")?,
            job_title: row.get("job_title")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyRate {
    pub id: Option<i64>,
    pub from_currency: String,
    pub to_currency: String,
    pub average_rate: f64,
}

impl Entity for CurrencyRate {
    const TABLE: &'static str = "currency_rates";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["from_currency", "to_currency", "average_rate"];

    fn key(&self) -> Option<Value> {
        self.id.map(Value::Integer)
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.from_currency.clone()),
            Value::Text(self.to_currency.clone()),
            Value::Real(self.average_rate),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            from_currency: row.get("from_currency")?,
            to_currency: row.get("to_currency")?,
            average_rate: row.get("average_rate")?,
        })
    }
}

pub fn schema_options() -> SessionOptions {
    SessionOptions {
        init_sql: Some(SCHEMA.to_string()),
        ..SessionOptions::default()
    }
}

pub fn unit_of_work() -> UnitOfWork {
    UnitOfWork::open_in_memory(&schema_options()).unwrap()
}

/// File-backed unit of work; the schema is created only on first open.
pub fn file_unit_of_work(path: &Path) -> UnitOfWork {
    let options = SessionOptions {
        init_sql: Some(SCHEMA.replace("CREATE TABLE", "CREATE TABLE IF NOT EXISTS")),
        ..SessionOptions::default()
    };
    UnitOfWork::open(path, &options).unwrap()
}

pub fn name_starts_with(first: &'static str, last: &'static str) -> Predicate<Employee> {
    Predicate::always()
        .and(move |e: &Employee| e.first_name.starts_with(first))
        .and(move |e: &Employee| e.last_name.starts_with(last))
}

/// Inserts `count` employees named `Emp{n:02}` and commits them.
pub fn seed_employees(uow: &mut UnitOfWork, count: usize) {
    let repo = uow.repository::<Employee>();
    let staff: Vec<Employee> = (0..count)
        .map(|n| {
            Employee::new(
                &format!("Emp{n:02}"),
                if n % 2 == 0 { "Even" } else { "Odd" },
                &format!("emp{n}@example.com"),
                "Clerk",
            )
        })
        .collect();
    assert!(repo.insert(&staff).is_success());
    assert!(uow.save().is_success());
}
