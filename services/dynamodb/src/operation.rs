use crate::marshal::{decode, encode, encode_value, field_error};
use crate::Client;
use ddbkit_core::{Error, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Options of [`Client::list_tables`].
#[derive(Debug, Clone, Default)]
pub struct ListTablesOptions {
    /// Maximum number of table names to return.
    pub limit: Option<u32>,
    /// Name of the table to start the listing after.
    pub exclusive_start_table_name: Option<String>,
}

/// Options of [`Client::get_item`].
#[derive(Debug, Clone, Default)]
pub struct GetItemOptions {
    /// Only return these attributes.
    pub attributes_to_get: Option<Vec<String>>,
    /// Read with strong consistency.
    pub consistent_read: bool,
}

/// Which attributes a write returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnValues {
    /// Return nothing.
    None,
    /// Every attribute as it was before the write.
    AllOld,
    /// Updated attributes as they were before the write.
    UpdatedOld,
    /// Every attribute as it is after the write.
    AllNew,
    /// Updated attributes as they are after the write.
    UpdatedNew,
}

/// Options shared by [`Client::put_item`], [`Client::delete_item`] and
/// [`Client::update_item`].
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Conditions the stored item must meet for the write to happen.
    ///
    /// A `null` value requires the attribute to be absent.
    pub expected: Option<Map<String, Value>>,
    /// Attributes to return.
    pub return_values: Option<ReturnValues>,
}

/// What [`Client::update_item`] does to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateAction {
    /// Replace the attribute.
    Put,
    /// Add to a number or a set.
    Add,
    /// Remove the attribute, or values from a set.
    Delete,
}

/// One attribute change of [`Client::update_item`].
#[derive(Debug, Clone, Default)]
pub struct AttributeUpdate {
    /// New value, or values to add or remove.
    pub value: Option<Value>,
    /// Action to take, the service defaults to `PUT`.
    pub action: Option<UpdateAction>,
}

/// Output of [`Client::get_item`].
#[derive(Debug, Clone, PartialEq)]
pub struct GetItemOutput {
    /// The item, `None` when no item matches the key.
    pub item: Option<Map<String, Value>>,
    /// Capacity units consumed by the read.
    pub consumed_capacity_units: f64,
}

/// Output of the write operations.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutput {
    /// Attributes selected by [`WriteOptions::return_values`].
    pub attributes: Option<Map<String, Value>>,
    /// Capacity units consumed by the write.
    pub consumed_capacity_units: f64,
}

impl Client {
    /// List the tables of the account.
    pub async fn list_tables(&self, opts: ListTablesOptions) -> Result<Vec<String>> {
        let mut body = Map::new();
        if let Some(limit) = opts.limit {
            body.insert("Limit".to_string(), limit.into());
        }
        if let Some(name) = opts.exclusive_start_table_name {
            body.insert("ExclusiveStartTableName".to_string(), name.into());
        }

        let resp = self.execute("ListTables", &Value::Object(body)).await?;
        match resp.get("TableNames") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(names) => serde_json::from_value(names.clone()).map_err(|e| {
                Error::unexpected("TableNames must be an array of strings").with_source(e)
            }),
        }
    }

    /// Describe a table: status, key schema, provisioned throughput.
    ///
    /// The `Table` object is returned as sent by the service.
    pub async fn describe_table(&self, table: &str) -> Result<Value> {
        let mut resp = self
            .execute("DescribeTable", &json!({ "TableName": table }))
            .await?;
        Ok(resp
            .as_object_mut()
            .and_then(|m| m.remove("Table"))
            .unwrap_or(Value::Null))
    }

    /// Read the item stored under `hash` and `range`.
    pub async fn get_item(
        &self,
        table: &str,
        hash: &Value,
        range: Option<&Value>,
        opts: GetItemOptions,
    ) -> Result<GetItemOutput> {
        let mut body = Map::new();
        body.insert("TableName".to_string(), table.into());
        body.insert("Key".to_string(), key(hash, range)?);
        if let Some(attrs) = opts.attributes_to_get {
            body.insert("AttributesToGet".to_string(), attrs.into());
        }
        if opts.consistent_read {
            body.insert("ConsistentRead".to_string(), true.into());
        }

        let resp = self.execute("GetItem", &Value::Object(body)).await?;
        Ok(GetItemOutput {
            item: decode_field(&resp, "Item")?,
            consumed_capacity_units: consumed_units(&resp),
        })
    }

    /// Store `item`, replacing any item with the same key.
    pub async fn put_item(
        &self,
        table: &str,
        item: &Map<String, Value>,
        opts: WriteOptions,
    ) -> Result<WriteOutput> {
        let mut body = Map::new();
        body.insert("TableName".to_string(), table.into());
        body.insert("Item".to_string(), serde_json::to_value(encode(item)?)?);
        write_options(&mut body, opts)?;

        self.write("PutItem", body).await
    }

    /// Delete the item stored under `hash` and `range`.
    pub async fn delete_item(
        &self,
        table: &str,
        hash: &Value,
        range: Option<&Value>,
        opts: WriteOptions,
    ) -> Result<WriteOutput> {
        let mut body = Map::new();
        body.insert("TableName".to_string(), table.into());
        body.insert("Key".to_string(), key(hash, range)?);
        write_options(&mut body, opts)?;

        self.write("DeleteItem", body).await
    }

    /// Change attributes of the item stored under `hash` and `range`,
    /// creating it if needed.
    pub async fn update_item(
        &self,
        table: &str,
        hash: &Value,
        range: Option<&Value>,
        updates: &[(String, AttributeUpdate)],
        opts: WriteOptions,
    ) -> Result<WriteOutput> {
        let mut attribute_updates = Map::new();
        for (name, update) in updates {
            let mut entry = Map::new();
            if let Some(value) = &update.value {
                let encoded = encode_value(value).map_err(|e| field_error(name, e))?;
                if let Some(v) = encoded {
                    entry.insert("Value".to_string(), serde_json::to_value(v)?);
                }
            }
            if let Some(action) = update.action {
                entry.insert("Action".to_string(), serde_json::to_value(action)?);
            }
            attribute_updates.insert(name.clone(), Value::Object(entry));
        }

        let mut body = Map::new();
        body.insert("TableName".to_string(), table.into());
        body.insert("Key".to_string(), key(hash, range)?);
        body.insert(
            "AttributeUpdates".to_string(),
            Value::Object(attribute_updates),
        );
        write_options(&mut body, opts)?;

        self.write("UpdateItem", body).await
    }

    async fn write(&self, operation: &str, body: Map<String, Value>) -> Result<WriteOutput> {
        let resp = self.execute(operation, &Value::Object(body)).await?;
        Ok(WriteOutput {
            attributes: decode_field(&resp, "Attributes")?,
            consumed_capacity_units: consumed_units(&resp),
        })
    }
}

/// Build the `Key` of an item.
fn key(hash: &Value, range: Option<&Value>) -> Result<Value> {
    let mut key = Map::new();
    let hash = encode_value(hash)?.ok_or_else(|| Error::validation("hash key must not be null"))?;
    key.insert("HashKeyElement".to_string(), serde_json::to_value(hash)?);
    if let Some(range) = range {
        if let Some(range) = encode_value(range)? {
            key.insert("RangeKeyElement".to_string(), serde_json::to_value(range)?);
        }
    }
    Ok(Value::Object(key))
}

fn write_options(body: &mut Map<String, Value>, opts: WriteOptions) -> Result<()> {
    if let Some(expected) = opts.expected {
        let mut conditions = Map::new();
        for (name, value) in &expected {
            let condition = match encode_value(value).map_err(|e| field_error(name, e))? {
                Some(v) => json!({ "Value": v }),
                None => json!({ "Exists": false }),
            };
            conditions.insert(name.clone(), condition);
        }
        body.insert("Expected".to_string(), Value::Object(conditions));
    }
    if let Some(rv) = opts.return_values {
        body.insert("ReturnValues".to_string(), serde_json::to_value(rv)?);
    }
    Ok(())
}

fn decode_field(resp: &Value, field: &str) -> Result<Option<Map<String, Value>>> {
    match resp.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(m)) => decode(m).map(Some),
        Some(_) => Err(Error::validation(format!("{field} must be an object"))),
    }
}

fn consumed_units(resp: &Value) -> f64 {
    resp.get("ConsumedCapacityUnits")
        .and_then(Value::as_f64)
        .unwrap_or_default()
}
