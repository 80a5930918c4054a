use super::{OrderStorage, ProdStorage};
use crate::error::GenericError;
use crate::model::{NewOrder, OrderRecord, order, order_item};
use async_trait::async_trait;
use common::api::{ModelId, OrderStatus};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::debug;

fn into_record(order: order::Model, mut items: Vec<order_item::Model>) -> OrderRecord {
    items.sort_by_key(|item| item.id);
    OrderRecord { order, items }
}

#[async_trait]
impl OrderStorage for ProdStorage {
    async fn create_order(&self, new_order: NewOrder) -> Result<OrderRecord, GenericError> {
        let txn = self.db.begin().await?;

        let order = order::ActiveModel {
            id: NotSet,
            user_id: Set(new_order.user_id),
            user_email: Set(new_order.user_email),
            status: Set(OrderStatus::Created.to_string()),
            total: Set(new_order.total),
            created_at: Set(chrono::Utc::now().naive_utc()),
        };
        let order = order.insert(&txn).await?;

        let mut items = Vec::with_capacity(new_order.items.len());
        for item in new_order.items {
            let line = order_item::ActiveModel {
                id: NotSet,
                order_id: Set(order.id),
                product_id: Set(item.product_id),
                qty: Set(item.qty),
                unit_price: Set(item.unit_price),
            };
            items.push(line.insert(&txn).await?);
        }

        txn.commit().await?;
        debug!(order_id = order.id, lines = items.len(), "Order stored");

        Ok(into_record(order, items))
    }

    async fn get_user_order(
        &self,
        order_id: ModelId,
        user_id: ModelId,
    ) -> Result<Option<OrderRecord>, GenericError> {
        let Some(order) = order::Entity::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&self.db)
            .await?;
        Ok(Some(into_record(order, items)))
    }

    async fn list_user_orders(&self, user_id: ModelId) -> Result<Vec<OrderRecord>, GenericError> {
        let rows = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::Id)
            .find_with_related(order_item::Entity)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(order, items)| into_record(order, items))
            .collect())
    }

    async fn set_order_status(
        &self,
        order_id: ModelId,
        status: OrderStatus,
    ) -> Result<bool, GenericError> {
        let result = order::Entity::update_many()
            .col_expr(order::Column::Status, Expr::value(status.to_string()))
            .filter(order::Column::Id.eq(order_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
