use std::collections::HashMap;

use pgcast::{
    BoxError, Catalog, CatalogRow, DateStyle,
    postgres::Oid,
    types::{FIELDS_QUERY, TYPE_QUERY},
};

/// Catalog answering from a fixed set of types.
pub struct Memory {
    types: Vec<[String; 9]>,
    fields: HashMap<Oid, Vec<(&'static str, Oid)>>,
    pub date_style: DateStyle,
}

impl Memory {
    pub fn new() -> Self {
        let mut me = Self { types: vec![], fields: HashMap::new(), date_style: DateStyle::Iso };
        me.add(16, "bool", "boolean", 'b', 'B', 0, 0);
        me.add(23, "int4", "integer", 'b', 'N', 0, 0);
        me.add(25, "text", "text", 'b', 'S', 0, 0);
        me.add(1007, "_int4", "integer[]", 'b', 'A', 0, 23);
        me.add(1700, "numeric", "numeric", 'b', 'N', 0, 0);
        me.add(16400, "inventory_item", "inventory_item", 'c', 'C', 16398, 0);
        me.add(16401, "_inventory_item", "inventory_item[]", 'b', 'A', 0, 16400);
        me.add(16410, "on_hand", "on_hand", 'c', 'C', 16408, 0);
        me.fields.insert(16398, vec![("name", 25), ("supplier_id", 23), ("price", 1700)]);
        me.fields.insert(16408, vec![("item", 16400), ("count", 23)]);
        me
    }

    #[allow(clippy::too_many_arguments)]
    fn add(&mut self, oid: Oid, name: &str, regtype: &str, typtype: char, category: char, relid: Oid, elem: Oid) {
        self.types.push([
            oid.to_string(),
            name.into(),
            regtype.into(),
            "-1".into(),
            typtype.into(),
            category.into(),
            ",".into(),
            relid.to_string(),
            elem.to_string(),
        ]);
    }
}

impl Catalog for Memory {
    fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<CatalogRow>, BoxError> {
        tracing::debug!(sql, ?params, "catalog query");
        let param = params.first().copied().unwrap_or_default();
        if sql == TYPE_QUERY {
            Ok(self
                .types
                .iter()
                .filter(|row| row[0] == param || row[1] == param || row[2] == param)
                .map(|row| row.iter().cloned().map(Some).collect())
                .collect())
        } else if sql == FIELDS_QUERY {
            let relid: Oid = param.parse()?;
            Ok(self
                .fields
                .get(&relid)
                .into_iter()
                .flatten()
                .map(|(name, oid)| [Some(name.to_string()), Some(oid.to_string())].into_iter().collect())
                .collect())
        } else {
            Err(format!("unsupported query: {sql}").into())
        }
    }

    fn date_style(&self) -> DateStyle {
        self.date_style
    }
}
