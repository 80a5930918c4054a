use super::{PaymentStorage, ProdStorage};
use crate::error::GenericError;
use crate::model::{NewPayment, Payment, payment};
use async_trait::async_trait;
use common::api::ModelId;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set};

#[async_trait]
impl PaymentStorage for ProdStorage {
    async fn find_order_payment(
        &self,
        order_id: ModelId,
        user_id: ModelId,
    ) -> Result<Option<Payment>, GenericError> {
        Ok(payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .filter(payment::Column::UserId.eq(user_id))
            .order_by_desc(payment::Column::Id)
            .one(&self.db)
            .await?)
    }

    async fn create_payment(&self, new_payment: NewPayment) -> Result<Payment, GenericError> {
        let model = payment::ActiveModel {
            id: NotSet,
            order_id: Set(new_payment.order_id),
            user_id: Set(new_payment.user_id),
            amount: Set(new_payment.amount),
            status: Set(new_payment.status.to_string()),
            shipping_address: Set(new_payment.shipping_address),
            phone_number: Set(new_payment.phone_number),
            created_at: Set(chrono::Utc::now().naive_utc()),
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn get_user_payment(
        &self,
        payment_id: ModelId,
        user_id: ModelId,
    ) -> Result<Option<Payment>, GenericError> {
        Ok(payment::Entity::find_by_id(payment_id)
            .filter(payment::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?)
    }

    async fn list_user_payments(&self, user_id: ModelId) -> Result<Vec<Payment>, GenericError> {
        Ok(payment::Entity::find()
            .filter(payment::Column::UserId.eq(user_id))
            .order_by_desc(payment::Column::Id)
            .all(&self.db)
            .await?)
    }
}
