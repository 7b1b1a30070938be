pub mod types;
pub mod utils;
pub mod env;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn message_serializes_flat() {
        let m = types::Message::new("Logout successful");
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v, serde_json::json!({"message": "Logout successful"}));
    }
}
