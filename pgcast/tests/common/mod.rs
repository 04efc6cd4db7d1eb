#![allow(dead_code)]
use std::collections::HashMap;

use pgcast::{
    BoxError, Catalog, CatalogRow, DateStyle, IntervalStyle,
    postgres::Oid,
    types::{FIELDS_QUERY, TYPE_QUERY},
};

/// In memory `pg_type` and `pg_attribute`.
#[derive(Default)]
pub struct Scripted {
    types: Vec<Vec<String>>,
    fields: HashMap<Oid, Vec<(String, Oid)>>,
    pub date_style: DateStyle,
    pub interval_style: IntervalStyle,
    pub queries: Vec<String>,
    pub offline: bool,
}

impl Scripted {
    pub fn new() -> Self {
        Self::default()
            .base(16, "bool", "boolean")
            .base(23, "int4", "integer")
            .base(25, "text", "text")
            .base(1700, "numeric", "numeric")
            .base(1082, "date", "date")
            .array(1007, "_int4", "integer[]", 23)
            .array(1009, "_text", "text[]", 25)
            .with(vec![
                "603".into(), "box".into(), "box".into(), "32".into(), "b".into(), "G".into(),
                ";".into(), "0".into(), "600".into(),
            ])
            .array(1020, "_box", "box[]", 603)
            .composite(16400, "inventory_item", 16398, &[("name", 25), ("supplier_id", 23), ("price", 1700)])
            .array(16401, "_inventory_item", "inventory_item[]", 16400)
            .composite(16410, "on_hand", 16408, &[("item", 16400), ("count", 23)])
    }

    fn with(mut self, row: Vec<String>) -> Self {
        self.types.push(row);
        self
    }

    pub fn base(self, oid: Oid, name: &str, regtype: &str) -> Self {
        self.row(oid, name, regtype, "b", "N", 0, 0)
    }

    pub fn array(self, oid: Oid, name: &str, regtype: &str, element: Oid) -> Self {
        self.row(oid, name, regtype, "b", "A", 0, element)
    }

    pub fn composite(mut self, oid: Oid, name: &str, relid: Oid, fields: &[(&str, Oid)]) -> Self {
        self.fields.insert(relid, fields.iter().map(|(n, o)| (n.to_string(), *o)).collect());
        self.row(oid, name, name, "c", "C", relid, 0)
    }

    #[allow(clippy::too_many_arguments)]
    fn row(self, oid: Oid, name: &str, regtype: &str, typtype: &str, category: &str, relid: Oid, elem: Oid) -> Self {
        self.with(vec![
            oid.to_string(),
            name.into(),
            regtype.into(),
            "-1".into(),
            typtype.into(),
            category.into(),
            ",".into(),
            relid.to_string(),
            elem.to_string(),
        ])
    }

    pub fn type_queries(&self) -> usize {
        self.queries.iter().filter(|q| q.as_str() == TYPE_QUERY).count()
    }
}

impl Catalog for Scripted {
    fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<CatalogRow>, BoxError> {
        if self.offline {
            return Err("connection is closed".into());
        }
        self.queries.push(sql.to_owned());
        let param = params.first().copied().unwrap_or_default();
        if sql == TYPE_QUERY {
            Ok(self
                .types
                .iter()
                .filter(|row| row[..3].iter().any(|col| col == param))
                .map(|row| row.iter().cloned().map(Some).collect())
                .collect())
        } else if sql == FIELDS_QUERY {
            let relid: Oid = param.parse()?;
            Ok(self
                .fields
                .get(&relid)
                .into_iter()
                .flatten()
                .map(|(name, oid)| [Some(name.clone()), Some(oid.to_string())].into_iter().collect())
                .collect())
        } else {
            Err(format!("unexpected query: {sql}").into())
        }
    }

    fn date_style(&self) -> DateStyle {
        self.date_style
    }

    fn interval_style(&self) -> IntervalStyle {
        self.interval_style
    }
}
