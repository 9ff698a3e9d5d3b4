//! Qdrant backend implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfig;
use qdrant_client::qdrant::with_payload_selector::SelectorOptions;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
    Filter as QdrantFilter, PointId, PointStruct, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};

use crate::TRACING_TARGET;
use crate::config::{DistanceMetric, QdrantConfig};
use crate::error::{VectorError, VectorResult};
use crate::filter::{FieldCondition, Filter};
use crate::store::{
    CollectionSpec, PayloadIndexKind, ScoredHit, StoredRecord, VectorBackend, VectorRecord,
};

/// Qdrant backend implementation.
pub struct QdrantBackend {
    client: Qdrant,
}

impl QdrantBackend {
    /// Connects to a Qdrant server.
    pub async fn connect(config: &QdrantConfig) -> VectorResult<Self> {
        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .build()
            .map_err(|e| VectorError::connection(e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET,
            url = %config.url,
            "Connected to Qdrant"
        );

        Ok(Self { client })
    }

    /// Extracts point ID as a string.
    fn extract_point_id(id: Option<PointId>) -> Option<String> {
        use qdrant_client::qdrant::point_id::PointIdOptions;

        match id {
            Some(PointId {
                point_id_options: Some(id),
            }) => match id {
                PointIdOptions::Num(n) => Some(n.to_string()),
                PointIdOptions::Uuid(s) => Some(s),
            },
            _ => None,
        }
    }
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    async fn collection_exists(&self, name: &str) -> VectorResult<bool> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| VectorError::backend(e.to_string()))
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> VectorResult<()> {
        let vectors_config = VectorsConfig::Params(
            VectorParamsBuilder::new(spec.dimensions as u64, distance_to_qdrant(spec.distance))
                .build(),
        );

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&spec.name).vectors_config(vectors_config),
            )
            .await
            .map_err(|e| VectorError::backend(e.to_string()))?;

        for index in &spec.payload_indexes {
            self.client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    &spec.name,
                    &index.field,
                    index_kind_to_qdrant(index.kind),
                ))
                .await
                .map_err(|e| VectorError::backend(e.to_string()))?;
        }

        tracing::info!(
            target: TRACING_TARGET,
            collection = %spec.name,
            dimensions = %spec.dimensions,
            indexes = %spec.payload_indexes.len(),
            "Created Qdrant collection"
        );

        Ok(())
    }

    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> VectorResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|r| {
                let payload: HashMap<String, qdrant_client::qdrant::Value> = r
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, json_to_qdrant_value(v)))
                    .collect();

                PointStruct::new(r.id, r.vector, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points))
            .await
            .map_err(|e| VectorError::backend(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: usize,
        filter: Filter,
    ) -> VectorResult<Vec<ScoredHit>> {
        let mut search = SearchPointsBuilder::new(collection, query, limit as u64)
            .with_payload(SelectorOptions::Enable(true));

        if !filter.is_empty() {
            search = search.filter(filter_to_qdrant(&filter));
        }

        let response = self
            .client
            .search_points(search)
            .await
            .map_err(|e| VectorError::backend(e.to_string()))?;

        let hits = response
            .result
            .into_iter()
            .map(|point| {
                let id = Self::extract_point_id(point.id).unwrap_or_default();

                let payload: HashMap<String, serde_json::Value> = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, qdrant_value_to_json(v)))
                    .collect();

                ScoredHit {
                    id,
                    score: point.score,
                    payload,
                }
            })
            .collect();

        Ok(hits)
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Filter,
        limit: usize,
    ) -> VectorResult<Vec<StoredRecord>> {
        let mut scroll = ScrollPointsBuilder::new(collection)
            .limit(limit as u32)
            .with_payload(SelectorOptions::Enable(true))
            .with_vectors(false);

        if !filter.is_empty() {
            scroll = scroll.filter(filter_to_qdrant(&filter));
        }

        let response = self
            .client
            .scroll(scroll)
            .await
            .map_err(|e| VectorError::backend(e.to_string()))?;

        let records = response
            .result
            .into_iter()
            .map(|point| {
                let id = Self::extract_point_id(point.id).unwrap_or_default();

                let payload: HashMap<String, serde_json::Value> = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, qdrant_value_to_json(v)))
                    .collect();

                StoredRecord { id, payload }
            })
            .collect();

        Ok(records)
    }
}

/// Converts the store distance metric to the Qdrant distance.
fn distance_to_qdrant(distance: DistanceMetric) -> Distance {
    match distance {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::Dot => Distance::Dot,
        DistanceMetric::Euclidean => Distance::Euclid,
    }
}

/// Converts the payload index kind to the Qdrant field type.
fn index_kind_to_qdrant(kind: PayloadIndexKind) -> FieldType {
    match kind {
        PayloadIndexKind::Keyword => FieldType::Keyword,
        PayloadIndexKind::Integer => FieldType::Integer,
        PayloadIndexKind::Bool => FieldType::Bool,
    }
}

/// Converts a typed filter into Qdrant conditions.
fn filter_to_qdrant(filter: &Filter) -> QdrantFilter {
    let conditions: Vec<Condition> = filter
        .conditions()
        .iter()
        .map(|condition| match condition {
            FieldCondition::Keyword { key, value } => {
                Condition::matches(key.clone(), value.clone())
            }
            FieldCondition::Integer { key, value } => Condition::matches(key.clone(), *value),
            FieldCondition::Bool { key, value } => Condition::matches(key.clone(), *value),
        })
        .collect();

    QdrantFilter::must(conditions)
}

/// Converts JSON value to Qdrant value.
fn json_to_qdrant_value(value: serde_json::Value) -> qdrant_client::qdrant::Value {
    use qdrant_client::qdrant::value::Kind;

    let kind = match value {
        serde_json::Value::Null => Kind::NullValue(0),
        serde_json::Value::Bool(b) => Kind::BoolValue(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Kind::IntegerValue(i)
            } else if let Some(f) = n.as_f64() {
                Kind::DoubleValue(f)
            } else {
                Kind::StringValue(n.to_string())
            }
        }
        serde_json::Value::String(s) => Kind::StringValue(s),
        serde_json::Value::Array(arr) => {
            let values: Vec<qdrant_client::qdrant::Value> =
                arr.into_iter().map(json_to_qdrant_value).collect();
            Kind::ListValue(qdrant_client::qdrant::ListValue { values })
        }
        serde_json::Value::Object(obj) => {
            let fields: HashMap<String, qdrant_client::qdrant::Value> = obj
                .into_iter()
                .map(|(k, v)| (k, json_to_qdrant_value(v)))
                .collect();
            Kind::StructValue(qdrant_client::qdrant::Struct { fields })
        }
    };

    qdrant_client::qdrant::Value { kind: Some(kind) }
}

/// Converts Qdrant value to JSON value.
fn qdrant_value_to_json(value: qdrant_client::qdrant::Value) -> serde_json::Value {
    use qdrant_client::qdrant::value::Kind;

    match value.kind {
        Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::IntegerValue(i)) => serde_json::json!(i),
        Some(Kind::DoubleValue(f)) => serde_json::json!(f),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::ListValue(list)) => {
            let arr: Vec<serde_json::Value> =
                list.values.into_iter().map(qdrant_value_to_json).collect();
            serde_json::Value::Array(arr)
        }
        Some(Kind::StructValue(obj)) => {
            let map: serde_json::Map<String, serde_json::Value> = obj
                .fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_value_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
        None => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trips_through_qdrant_values() {
        let original = serde_json::json!({
            "text": "In fiscal year 2022 revenue was $10 million",
            "metadata": {
                "source": "annual_report_2022.pdf",
                "contains_financial_info": true,
                "years_mentioned": [2022],
                "start_index": 0,
            },
        });

        let round_tripped = qdrant_value_to_json(json_to_qdrant_value(original.clone()));
        assert_eq!(round_tripped, original);
    }

    #[test]
    fn typed_filter_maps_every_condition() {
        let filter = Filter::new()
            .must_match_bool("metadata.contains_financial_info", true)
            .must_match_integer("metadata.years_mentioned", 2022)
            .must_match_keyword("metadata.source", "report.pdf");

        let qdrant_filter = filter_to_qdrant(&filter);
        assert_eq!(qdrant_filter.must.len(), 3);
    }
}
