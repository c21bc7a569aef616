use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::types::{parse_number, parse_text, InvalidValue};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Equipment {
    pub equipment_id: i32,
    pub equipment_name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentField {
    Name,
    Quantity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EquipmentUpdate {
    Name(String),
    Quantity(i32),
}

impl EquipmentUpdate {
    pub fn parse(field: EquipmentField, raw: &str) -> Result<Self, InvalidValue> {
        Ok(match field {
            EquipmentField::Name => EquipmentUpdate::Name(parse_text("equipment name", raw)?),
            EquipmentField::Quantity => {
                let quantity: i32 = parse_number("quantity", raw)?;
                if quantity < 0 {
                    return Err(InvalidValue::new("quantity", raw));
                }
                EquipmentUpdate::Quantity(quantity)
            }
        })
    }
}

impl Equipment {
    pub async fn create(pool: &PgPool, name: &str, quantity: i32) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO equipment (equipment_name, quantity) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(quantity)
        .fetch_one(pool)
        .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM equipment ORDER BY equipment_id")
            .fetch_all(pool)
            .await
    }

    pub async fn apply_update(
        pool: &PgPool,
        equipment_id: i32,
        update: EquipmentUpdate,
    ) -> Result<u64, sqlx::Error> {
        let query = match update {
            EquipmentUpdate::Name(name) => {
                sqlx::query("UPDATE equipment SET equipment_name = $2 WHERE equipment_id = $1")
                    .bind(equipment_id)
                    .bind(name)
            }
            EquipmentUpdate::Quantity(quantity) => {
                sqlx::query("UPDATE equipment SET quantity = $2 WHERE equipment_id = $1")
                    .bind(equipment_id)
                    .bind(quantity)
            }
        };

        Ok(query.execute(pool).await?.rows_affected())
    }

    pub async fn delete(pool: &PgPool, equipment_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM equipment WHERE equipment_id = $1")
            .bind(equipment_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equipment_update_parse() {
        assert_eq!(
            EquipmentUpdate::parse(EquipmentField::Quantity, "8").unwrap(),
            EquipmentUpdate::Quantity(8)
        );
        assert!(EquipmentUpdate::parse(EquipmentField::Quantity, "-2").is_err());
        assert!(EquipmentUpdate::parse(EquipmentField::Quantity, "lots").is_err());
    }
}
