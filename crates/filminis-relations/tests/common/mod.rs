//! In-memory stand-in for the filminis REST backend.
//!
//! Join tables use the backend's names (`filme_genero` rows with `id_filme` /
//! `id_genero`) and inserting an existing pair fails like a primary key
//! violation. `DELETE /{join}/{movie}/{entity}` removes exactly that one pair,
//! as a server that routes both path segments would; deleting a missing pair
//! succeeds. `DELETE /{join}/{movie}` drops all of the movie's rows for the
//! type, which is what the reference backend ends up doing for the two-segment
//! form too, so this fake is only faithful to servers that honor the entity
//! id. Every request is recorded so tests can assert on the exact write
//! sequence.

#![allow(dead_code)]

use async_trait::async_trait;
use filminis_relations::{EntityId, Method, RelationType, Transport, TransportError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// A write against a join table, decoded from a recorded [`Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Add(RelationType, EntityId),
    Remove(RelationType, EntityId),
}

#[derive(Default)]
struct State {
    rows: BTreeMap<String, BTreeSet<(EntityId, EntityId)>>,
    movies: BTreeMap<EntityId, Value>,
    next_movie_id: EntityId,
    echo_created_id: bool,
    calls: Vec<Call>,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<(RelationType, EntityId)>,
    failing_requests: HashSet<(Method, String)>,
}

pub struct FakeCatalogApi {
    state: Mutex<State>,
}

impl FakeCatalogApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_movie_id: 1,
                ..State::default()
            }),
        }
    }

    /// Answer `POST /filme` with the new `id_filme`, like a backend that
    /// echoes created rows.
    pub fn echoing_created_ids(self) -> Self {
        self.state.lock().echo_created_id = true;
        self
    }

    pub fn with_movie(self, id: EntityId, title: &str) -> Self {
        {
            let mut state = self.state.lock();
            state
                .movies
                .insert(id, json!({"id_filme": id, "titulo": title}));
            state.next_movie_id = state.next_movie_id.max(id + 1);
        }
        self
    }

    /// Seeds associations without recording calls.
    pub fn with_relations(self, movie: EntityId, relation: RelationType, ids: &[EntityId]) -> Self {
        {
            let mut state = self.state.lock();
            let table = state.rows.entry(join_name(relation)).or_default();
            for id in ids {
                table.insert((movie, *id));
            }
        }
        self
    }

    pub fn fail_reads(&self, relation: RelationType) {
        self.state.lock().failing_reads.insert(join_name(relation));
    }

    /// Any add or remove of `entity_id` under `relation` fails with a 500.
    pub fn fail_writes(&self, relation: RelationType, entity_id: EntityId) {
        self.state
            .lock()
            .failing_writes
            .insert((relation, entity_id));
    }

    pub fn heal_writes(&self) {
        self.state.lock().failing_writes.clear();
    }

    pub fn fail_request(&self, method: Method, path: &str) {
        self.state
            .lock()
            .failing_requests
            .insert((method, path.to_string()));
    }

    pub fn stored(&self, movie: EntityId, relation: RelationType) -> Vec<EntityId> {
        self.state
            .lock()
            .rows
            .get(&join_name(relation))
            .map(|rows| {
                rows.iter()
                    .filter(|(m, _)| *m == movie)
                    .map(|(_, id)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn movie(&self, id: EntityId) -> Option<Value> {
        self.state.lock().movies.get(&id).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Join-table writes issued so far, in order, failed ones included.
    pub fn writes(&self) -> Vec<Write> {
        self.calls().iter().filter_map(decode_write).collect()
    }
}

pub fn join_name(relation: RelationType) -> String {
    format!("filme_{}", relation.backend_name())
}

fn relation_of(join: &str) -> Option<RelationType> {
    join.strip_prefix("filme_")?.parse().ok()
}

fn related_field(relation: RelationType) -> String {
    format!("id_{}", relation.backend_name())
}

fn decode_write(call: &Call) -> Option<Write> {
    let segments: Vec<&str> = call.path.trim_start_matches('/').split('/').collect();
    let relation = relation_of(segments.first()?)?;
    match call.method {
        Method::Post => {
            let id = call.body.as_ref()?.get(related_field(relation))?.as_u64()?;
            Some(Write::Add(relation, id))
        }
        Method::Delete => Some(Write::Remove(relation, segments.get(2)?.parse().ok()?)),
        _ => None,
    }
}

fn server_error(message: &str) -> TransportError {
    TransportError::Status {
        status: 500,
        message: message.to_string(),
    }
}

fn not_found() -> TransportError {
    TransportError::Status {
        status: 404,
        message: "Entidade inválida".to_string(),
    }
}

#[async_trait]
impl Transport for FakeCatalogApi {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let call = Call {
            method,
            path: path.to_string(),
            body: body.cloned(),
        };
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.calls.push(call.clone());

        if state.failing_requests.contains(&(method, path.to_string())) {
            return Err(server_error("injected failure"));
        }

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let resource = segments[0];
        let id: Option<EntityId> = segments.get(1).and_then(|s| s.parse().ok());

        if let Some(relation) = relation_of(resource) {
            if let Some(write) = decode_write(&call) {
                let target = match write {
                    Write::Add(_, id) | Write::Remove(_, id) => id,
                };
                if state.failing_writes.contains(&(relation, target)) {
                    return Err(server_error("Lost connection to MySQL server"));
                }
            }

            let field = related_field(relation);
            let table = state.rows.entry(resource.to_string()).or_default();
            return match (method, id) {
                (Method::Get, Some(movie)) => {
                    if state.failing_reads.contains(resource) {
                        return Err(server_error("read failed"));
                    }
                    let rows: Vec<Value> = table
                        .iter()
                        .filter(|(m, _)| *m == movie)
                        .map(|(m, r)| {
                            let mut row = serde_json::Map::new();
                            row.insert("id_filme".to_string(), json!(m));
                            row.insert(field.clone(), json!(r));
                            Value::Object(row)
                        })
                        .collect();
                    Ok(Value::Array(rows))
                }
                (Method::Post, None) => {
                    let body = body.ok_or_else(|| server_error("missing body"))?;
                    let movie = body["id_filme"].as_u64().ok_or_else(|| server_error("'id_filme'"))?;
                    let related = body[field.as_str()]
                        .as_u64()
                        .ok_or_else(|| server_error(&format!("'{field}'")))?;
                    if !table.insert((movie, related)) {
                        return Err(server_error("Duplicate entry for key 'PRIMARY'"));
                    }
                    Ok(json!({"message": "Relação criada"}))
                }
                (Method::Delete, Some(movie)) => {
                    let related: Option<EntityId> = segments.get(2).and_then(|s| s.parse().ok());
                    match related {
                        Some(related) => {
                            table.remove(&(movie, related));
                        }
                        None => table.retain(|(m, _)| *m != movie),
                    }
                    Ok(json!({"message": "Relação deletada"}))
                }
                _ => Err(not_found()),
            };
        }

        if resource != "filme" {
            return Err(not_found());
        }

        match (method, id) {
            (Method::Get, None) => Ok(Value::Array(state.movies.values().cloned().collect())),
            (Method::Get, Some(id)) => Ok(state.movies.get(&id).cloned().unwrap_or(json!({}))),
            (Method::Post, None) => {
                let mut row = body.cloned().unwrap_or(json!({}));
                let id = state.next_movie_id;
                state.next_movie_id += 1;
                row["id_filme"] = json!(id);
                state.movies.insert(id, row);
                if state.echo_created_id {
                    Ok(json!({"message": "Criado com sucesso", "id_filme": id}))
                } else {
                    Ok(json!({"message": "Criado com sucesso"}))
                }
            }
            (Method::Put, Some(id)) => {
                if let (Some(row), Some(Value::Object(fields))) = (state.movies.get_mut(&id), body) {
                    for (k, v) in fields {
                        row[k.as_str()] = v.clone();
                    }
                }
                Ok(json!({"message": "Atualizado"}))
            }
            (Method::Delete, Some(id)) => {
                state.movies.remove(&id);
                Ok(json!({"message": "Deletado"}))
            }
            _ => Err(not_found()),
        }
    }
}
