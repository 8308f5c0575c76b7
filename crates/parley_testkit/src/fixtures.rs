//! Record builders with controllable version clocks.

use parley_model::{
    encode_list, ApiConfig, Conversation, ConversationKind, ConversationSetting, EntityKind,
    Group, Message, Tombstone,
};
use parley_store::{upsert_record, MemoryStore};

/// Builds a conversation at the given version.
pub fn conversation(id: &str, title: &str, version: i64) -> Conversation {
    Conversation {
        id: id.to_string(),
        kind: ConversationKind::Text,
        title: title.to_string(),
        system_prompt: String::new(),
        created_at_ms: version,
        is_pinned: false,
        pinned_order: 0,
        updated_at_ms: version,
    }
}

/// Builds a user message at the given version.
pub fn message(id: &str, conversation_id: &str, text: &str, version: i64) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        text: text.to_string(),
        role: "user".to_string(),
        reasoning: String::new(),
        is_error: false,
        images_json: "[]".to_string(),
        timestamp_ms: version,
    }
}

/// Builds an api config at the given version.
pub fn api_config(id: &str, name: &str, version: i64) -> ApiConfig {
    ApiConfig {
        id: id.to_string(),
        provider: "openai".to_string(),
        name: name.to_string(),
        base_url: "https://api.example.com/v1".to_string(),
        api_key: "sk-test".to_string(),
        models_json: encode_list(&["gpt-4o"]),
        channel: String::new(),
        tools_json: "[]".to_string(),
        modality: "text".to_string(),
        is_default: false,
        updated_at_ms: version,
    }
}

/// Builds a group holding the given conversations.
pub fn group(id: &str, name: &str, member_ids: &[&str], version: i64) -> Group {
    Group {
        id: id.to_string(),
        name: name.to_string(),
        conversation_ids_json: encode_list(member_ids),
        updated_at_ms: version,
    }
}

/// Builds settings for a conversation at the given version.
pub fn setting(conversation_id: &str, version: i64) -> ConversationSetting {
    ConversationSetting {
        conversation_id: conversation_id.to_string(),
        kind: ConversationKind::Text,
        text_json: "{}".to_string(),
        image_json: "{}".to_string(),
        updated_at_ms: version,
    }
}

/// Builds a tombstone.
pub fn tombstone(kind: EntityKind, target_id: &str, deleted_at_ms: i64, device_id: &str) -> Tombstone {
    Tombstone::new(kind, target_id, deleted_at_ms, device_id)
}

/// A store seeded with one record of each entity kind for `user`, all
/// versioned between 100 and 500.
pub fn seeded_store(user: &str) -> MemoryStore {
    let store = MemoryStore::new();
    upsert_record(&store, user, &conversation("c1", "seeded", 100)).unwrap();
    upsert_record(&store, user, &message("m1", "c1", "hello", 200)).unwrap();
    upsert_record(&store, user, &api_config("a1", "default", 300)).unwrap();
    upsert_record(&store, user, &group("g1", "work", &["c1"], 400)).unwrap();
    upsert_record(&store, user, &setting("c1", 500)).unwrap();
    store
}
