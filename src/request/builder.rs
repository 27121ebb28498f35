//! Compiles access plans and single-item mutations into store requests.

use crate::metadata::TableMetadata;
use crate::planner::{AccessPlan, Operator, PlanOperation, Predicate};
use crate::request::errors::{BuildError, BuildResult};
use crate::request::expression::{update_clause, ExpressionBuilder};
use crate::request::options::{CallOptions, OnConflict, Projection, WriteOptions};
use crate::store::{
    AttributeValue, BatchGetRequest, DeleteItemRequest, Item, KeyAttributeType, NamePlaceholders,
    PointGetRequest, PutItemRequest, QueryRequest, ScanRequest, StoreRequest, UpdateItemRequest,
    ValuePlaceholders,
};

/// Compiles a fetch plan into the store request it executes as.
pub fn build_fetch(
    plan: &AccessPlan,
    options: &CallOptions,
    projection: &Projection,
) -> BuildResult<StoreRequest> {
    match plan.operation {
        PlanOperation::PointGet => build_point_get(plan, options, projection),
        PlanOperation::BatchGet => build_batch_get(plan, options, projection),
        PlanOperation::Query => build_query(plan, options, projection),
        PlanOperation::Scan => build_scan(plan, options, projection),
    }
}

fn build_point_get(
    plan: &AccessPlan,
    options: &CallOptions,
    projection: &Projection,
) -> BuildResult<StoreRequest> {
    if !plan.residual_filters.is_empty() {
        return Err(malformed(plan, "point read cannot carry residual filters"));
    }
    let (field, value) = match &plan.key_conditions[..] {
        [Predicate {
            field,
            operator: Operator::Eq(value),
        }] => (field, value),
        _ => return Err(malformed(plan, "point read requires exactly one eq key condition")),
    };
    let mut builder = ExpressionBuilder::new();
    let projection = projection_clause(&mut builder, projection);
    let (names, _) = builder.into_parts();
    Ok(StoreRequest::PointGet(PointGetRequest {
        table: plan.table.clone(),
        key: key_entry(field, value)?,
        consistent_read: options.consistent_read,
        projection,
        names,
    }))
}

fn build_batch_get(
    plan: &AccessPlan,
    options: &CallOptions,
    projection: &Projection,
) -> BuildResult<StoreRequest> {
    if !plan.residual_filters.is_empty() {
        return Err(malformed(plan, "batch read cannot carry residual filters"));
    }
    let (hash_field, hash_values) = match plan.key_conditions.first() {
        Some(Predicate {
            field,
            operator: Operator::In(values),
        }) => (field, values),
        _ => {
            return Err(malformed(
                plan,
                "batch read requires an in condition on the hash attribute",
            ))
        }
    };
    let range = match plan.key_conditions.get(1) {
        None => None,
        Some(Predicate {
            field,
            operator: Operator::Eq(value),
        }) => Some((field, vec![value.clone()])),
        Some(Predicate {
            field,
            operator: Operator::In(values),
        }) => Some((field, values.clone())),
        Some(_) => return Err(malformed(plan, "batch read range condition must be eq or in")),
    };

    let keys = match &range {
        None => hash_values
            .iter()
            .map(|value| key_entry(hash_field, value))
            .collect::<BuildResult<Vec<_>>>()?,
        Some((range_field, range_values)) => {
            if range_values.len() != hash_values.len() {
                return Err(malformed(plan, "batch read key lists must zip one-to-one"));
            }
            hash_values
                .iter()
                .zip(range_values.iter())
                .map(|(hash, range)| {
                    let mut key = key_entry(hash_field, hash)?;
                    key.append(&mut key_entry(range_field, range)?);
                    Ok(key)
                })
                .collect::<BuildResult<Vec<_>>>()?
        }
    };

    let mut builder = ExpressionBuilder::new();
    let projection = projection_clause(&mut builder, projection);
    let (names, _) = builder.into_parts();
    Ok(StoreRequest::BatchGet(BatchGetRequest {
        table: plan.table.clone(),
        keys,
        consistent_read: options.consistent_read,
        projection,
        names,
    }))
}

fn build_query(
    plan: &AccessPlan,
    options: &CallOptions,
    projection: &Projection,
) -> BuildResult<StoreRequest> {
    if plan.key_conditions.is_empty() {
        return Err(malformed(plan, "query requires a hash key condition"));
    }
    // The store orders a sort key lexically only for strings and bytes;
    // a prefix match against a numeric sort key is meaningless.
    if let (Some(index), Some(range_condition)) = (&plan.index, plan.key_conditions.get(1)) {
        if matches!(range_condition.operator, Operator::BeginsWith(_))
            && index.range_type == Some(KeyAttributeType::N)
        {
            return Err(BuildError::InvalidOperator {
                operator: "begins_with",
                attribute: range_condition.field.clone(),
                kind: "number".to_string(),
            });
        }
    }
    let mut builder = ExpressionBuilder::new();
    let key_condition = builder.key_condition(&plan.key_conditions)?;
    let filter = builder.filter(&plan.residual_filters)?;
    let projection = projection_clause(&mut builder, projection);
    let (names, values) = builder.into_parts();
    Ok(StoreRequest::Query(QueryRequest {
        table: plan.table.clone(),
        index: plan.index_name().map(str::to_string),
        key_condition,
        filter,
        projection,
        names,
        values,
        scan_index_forward: options.scan_index_forward,
        consistent_read: options.consistent_read,
        exclusive_start_key: options.exclusive_start_key.clone(),
        limit: options.scan_limit,
    }))
}

fn build_scan(
    plan: &AccessPlan,
    options: &CallOptions,
    projection: &Projection,
) -> BuildResult<StoreRequest> {
    let mut builder = ExpressionBuilder::new();
    let filter = builder.filter(&plan.residual_filters)?;
    let projection = projection_clause(&mut builder, projection);
    let (names, values) = builder.into_parts();
    Ok(StoreRequest::Scan(ScanRequest {
        table: plan.table.clone(),
        filter,
        projection,
        names,
        values,
        exclusive_start_key: options.exclusive_start_key.clone(),
        limit: options.scan_limit,
    }))
}

/// Compiles a single-record insert.
///
/// Nil fields are kept as explicit null markers or stripped per
/// `WriteOptions::insert_nil_fields`. Unless overwrite is requested the
/// request carries an absence condition on the hash key, so a collision
/// surfaces as the store's conditional-check failure.
pub fn build_put(
    metadata: &TableMetadata,
    record: Item,
    options: &WriteOptions,
) -> BuildResult<StoreRequest> {
    let item: Item = if options.insert_nil_fields {
        record
    } else {
        record
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect()
    };
    ensure_key_attribute(metadata, &item, &metadata.primary.hash_attribute)?;
    if let Some(range_attribute) = &metadata.primary.range_attribute {
        ensure_key_attribute(metadata, &item, range_attribute)?;
    }

    let (condition, names) = match options.on_conflict {
        OnConflict::Replace => (None, NamePlaceholders::new()),
        OnConflict::Raise | OnConflict::Nothing => {
            let mut builder = ExpressionBuilder::new();
            let clause = builder.attribute_absent(&metadata.primary.hash_attribute);
            let (names, _) = builder.into_parts();
            (Some(clause), names)
        }
    };
    Ok(StoreRequest::PutItem(PutItemRequest {
        table: metadata.table.clone(),
        item,
        condition,
        names,
        values: ValuePlaceholders::new(),
    }))
}

/// Compiles a single-record update against a full primary key.
///
/// Key attributes are immutable in the store and are dropped from the
/// change set. Nil'd fields compile to REMOVE clauses or null
/// assignments per `WriteOptions::remove_nil_fields`; directives add
/// ADD / DELETE / indexed REMOVE / list-prepend clauses.
pub fn build_update(
    metadata: &TableMetadata,
    key: Item,
    changes: Item,
    options: &WriteOptions,
) -> BuildResult<StoreRequest> {
    ensure_full_key(metadata, &key)?;

    let mut builder = ExpressionBuilder::new();
    let mut sets = Vec::new();
    let mut removes = Vec::new();
    for (field, value) in changes {
        if metadata.primary.is_key_attribute(&field) {
            continue;
        }
        if value.is_null() {
            if options.remove_nil_fields {
                removes.push(builder.remove_field(&field));
            } else {
                sets.push(builder.assign(&field, AttributeValue::Null));
            }
        } else if options.update.prepends(&field) {
            sets.push(builder.assign_prepend(&field, value));
        } else {
            sets.push(builder.assign(&field, value));
        }
    }
    let adds: Vec<String> = options
        .update
        .add
        .iter()
        .map(|(field, value)| builder.field_operand(field, value.clone()))
        .collect();
    let deletes: Vec<String> = options
        .update
        .delete
        .iter()
        .map(|(field, value)| builder.field_operand(field, value.clone()))
        .collect();
    for (field, indexes) in &options.update.pull_indexes {
        for index in indexes {
            removes.push(builder.remove_index(field, *index));
        }
    }

    let update = update_clause(&sets, &removes, &adds, &deletes);
    if update.is_empty() {
        return Err(BuildError::EmptyUpdate {
            table: metadata.table.clone(),
        });
    }
    let (names, values) = builder.into_parts();
    Ok(StoreRequest::UpdateItem(UpdateItemRequest {
        table: metadata.table.clone(),
        key,
        update,
        condition: None,
        names,
        values,
    }))
}

/// Compiles a single-record delete against a full primary key.
pub fn build_delete(metadata: &TableMetadata, key: Item) -> BuildResult<StoreRequest> {
    ensure_full_key(metadata, &key)?;
    Ok(StoreRequest::DeleteItem(DeleteItemRequest {
        table: metadata.table.clone(),
        key,
        condition: None,
        names: NamePlaceholders::new(),
        values: ValuePlaceholders::new(),
    }))
}

/// Assembles the full primary key for a single-item mutation. Key
/// components come from the supplied record first, then from the
/// explicit `range_key` option.
pub fn primary_key(
    metadata: &TableMetadata,
    record: &Item,
    range_key: Option<&AttributeValue>,
) -> BuildResult<Item> {
    let incomplete = |attribute: &str| BuildError::IncompleteKey {
        table: metadata.table.clone(),
        attribute: attribute.to_string(),
    };
    let mut key = Item::new();
    let hash_attribute = &metadata.primary.hash_attribute;
    let hash = record
        .get(hash_attribute)
        .filter(|value| !value.is_null())
        .ok_or_else(|| incomplete(hash_attribute))?;
    key.insert(hash_attribute.clone(), hash.clone());
    if let Some(range_attribute) = &metadata.primary.range_attribute {
        let range = record
            .get(range_attribute)
            .filter(|value| !value.is_null())
            .or(range_key)
            .ok_or_else(|| incomplete(range_attribute))?;
        key.insert(range_attribute.clone(), range.clone());
    }
    Ok(key)
}

fn projection_clause(builder: &mut ExpressionBuilder, projection: &Projection) -> Option<String> {
    match projection {
        Projection::Full => None,
        Projection::Attributes(attributes) => Some(builder.projection(attributes)),
    }
}

fn malformed(plan: &AccessPlan, reason: &'static str) -> BuildError {
    BuildError::MalformedPlan {
        table: plan.table.clone(),
        reason,
    }
}

fn key_entry(field: &str, value: &AttributeValue) -> BuildResult<Item> {
    if value.is_null() {
        return Err(BuildError::InvalidOperator {
            operator: "eq",
            attribute: field.to_string(),
            kind: "null".to_string(),
        });
    }
    let mut key = Item::new();
    key.insert(field.to_string(), value.clone());
    Ok(key)
}

fn ensure_key_attribute(
    metadata: &TableMetadata,
    item: &Item,
    attribute: &str,
) -> BuildResult<()> {
    match item.get(attribute) {
        Some(value) if !value.is_null() => Ok(()),
        _ => Err(BuildError::IncompleteKey {
            table: metadata.table.clone(),
            attribute: attribute.to_string(),
        }),
    }
}

fn ensure_full_key(metadata: &TableMetadata, key: &Item) -> BuildResult<()> {
    ensure_key_attribute(metadata, key, &metadata.primary.hash_attribute)?;
    if let Some(range_attribute) = &metadata.primary.range_attribute {
        ensure_key_attribute(metadata, key, range_attribute)?;
    }
    Ok(())
}
