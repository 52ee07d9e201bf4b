// ============================================================
// LISTING RECORD
// ============================================================
// Read-only view over a scraped job listing. Producers emit
// different subsets of fields, so the record keeps the raw JSON
// and every accessor falls back to a default.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label used when a record carries no sector
pub const UNKNOWN_SECTOR: &str = "Não informado";

/// A single job listing with producer-dependent fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingRecord(pub Value);

impl ListingRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Raw `id` field, whatever its JSON type
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id").filter(|v| !v.is_null())
    }

    /// `id` rendered for reports (`?` when missing)
    pub fn id_label(&self) -> String {
        match self.id() {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "?".to_string(),
        }
    }

    /// Overwrite the `id` field; no-op on non-object records
    pub fn set_id(&mut self, id: u64) {
        if let Some(obj) = self.0.as_object_mut() {
            obj.insert("id".to_string(), Value::from(id));
        }
    }

    pub fn sector(&self) -> Option<&str> {
        self.str_at(&["informacoes_basicas", "setor"])
    }

    pub fn sector_or_default(&self) -> &str {
        self.sector().unwrap_or(UNKNOWN_SECTOR)
    }

    /// Listing title: `fonte` is what the structured exports fill in,
    /// older exports only have `titulo`.
    pub fn title(&self) -> &str {
        self.str_at(&["informacoes_basicas", "fonte"])
            .or_else(|| self.str_at(&["informacoes_basicas", "titulo"]))
            .unwrap_or("")
    }

    /// Raw `titulo` field only
    pub fn raw_title(&self) -> &str {
        self.str_at(&["informacoes_basicas", "titulo"]).unwrap_or("")
    }

    pub fn company(&self) -> &str {
        self.str_at(&["informacoes_basicas", "empresa_principal"])
            .unwrap_or("")
    }

    pub fn city(&self) -> &str {
        self.str_at(&["localizacao", "cidade_extraida"]).unwrap_or("")
    }

    pub fn state(&self) -> &str {
        self.str_at(&["localizacao", "estado_extraido"]).unwrap_or("")
    }

    pub fn description(&self) -> &str {
        self.str_at(&["descricao_completa", "texto_completo"])
            .unwrap_or("")
    }

    pub fn responsibilities(&self) -> Vec<&str> {
        self.str_list_at(&["responsabilidades", "lista_responsabilidades"])
    }

    pub fn technical_skills(&self) -> Vec<&str> {
        self.str_list_at(&["habilidades_e_competencias", "habilidades_tecnicas"])
    }

    fn value_at(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.0, |current, key| current.get(key))
    }

    fn str_at(&self, path: &[&str]) -> Option<&str> {
        self.value_at(path).and_then(Value::as_str)
    }

    fn str_list_at(&self, path: &[&str]) -> Vec<&str> {
        self.value_at(path)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl From<Value> for ListingRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
