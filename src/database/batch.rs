use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel};

/// Rows per INSERT statement. Snapshots commonly span thousands of objects;
/// batching keeps round trips down without tripping statement size limits.
pub const INSERT_BATCH_SIZE: usize = 500;

/// Insert ActiveModels in manageable batches using the provided
/// connection/transaction.
pub async fn insert_in_batches<E, A, C>(conn: &C, mut models: Vec<A>) -> Result<(), DbErr>
where
    E: EntityTrait,
    A: ActiveModelTrait<Entity = E> + Send,
    C: ConnectionTrait,
    <E as EntityTrait>::Model: IntoActiveModel<A>,
{
    while !models.is_empty() {
        let batch_size = INSERT_BATCH_SIZE.min(models.len());
        let batch: Vec<A> = models.drain(..batch_size).collect();
        E::insert_many(batch).exec_without_returning(conn).await?;
    }
    Ok(())
}
