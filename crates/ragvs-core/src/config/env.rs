use super::{Config, Secret};

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_store();
        self.apply_env_overrides_rag();
        self.apply_env_overrides_gateway();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("RAGVS_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid RAGVS_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGVS_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("RAGVS_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("RAGVS_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        let api_key = std::env::var("RAGVS_OPENAI_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        if let Some(key) = api_key {
            self.secrets.openai_api_key = Some(Secret::new(key));
        }
    }

    fn apply_env_overrides_store(&mut self) {
        if let Ok(v) = std::env::var("RAGVS_QDRANT_URL").or_else(|_| std::env::var("VECTOR_STORE_URL")) {
            self.store.qdrant_url = Some(v).filter(|u| !u.trim().is_empty());
        }
        if let Ok(v) = std::env::var("RAGVS_STORE_COLLECTION") {
            self.store.collection = v;
        }
        if let Ok(v) = std::env::var("RAGVS_SQLITE_PATH") {
            self.store.sqlite_path = v;
        }
    }

    fn apply_env_overrides_rag(&mut self) {
        if let Ok(v) = std::env::var("RAGVS_RAG_MAX_CHARS") {
            match v.parse::<usize>() {
                Ok(n) => self.rag.max_chars = n,
                Err(_) => tracing::warn!("ignoring invalid RAGVS_RAG_MAX_CHARS value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("RAGVS_RAG_RETRIEVE_LIMIT") {
            match v.parse::<u64>() {
                Ok(n) => self.rag.retrieve_limit = n,
                Err(_) => tracing::warn!("ignoring invalid RAGVS_RAG_RETRIEVE_LIMIT value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("RAGVS_RAG_NUM_CANDIDATES") {
            match v.parse::<u64>() {
                Ok(n) => self.rag.num_candidates = n,
                Err(_) => tracing::warn!("ignoring invalid RAGVS_RAG_NUM_CANDIDATES value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("RAGVS_RAG_ROUTE_THRESHOLD") {
            match v.parse::<f32>() {
                Ok(t) => self.rag.route_threshold = t,
                Err(_) => tracing::warn!("ignoring invalid RAGVS_RAG_ROUTE_THRESHOLD value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("RAGVS_RAG_ANSWER_LANGUAGE") {
            self.rag.answer_language = v;
        }
    }

    fn apply_env_overrides_gateway(&mut self) {
        if let Ok(v) = std::env::var("RAGVS_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("RAGVS_GATEWAY_PORT") {
            match v.parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!("ignoring invalid RAGVS_GATEWAY_PORT value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("RAGVS_GATEWAY_TOKEN") {
            self.gateway.auth_token = Some(v).filter(|t| !t.is_empty());
        }
    }
}
