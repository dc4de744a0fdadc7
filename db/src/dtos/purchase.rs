use uuid::Uuid;

pub struct PurchaseCreateRequest {
    pub user_id: Uuid,
    pub resource_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
}
