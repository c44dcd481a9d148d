// orderflow/examples/reserve_and_charge.rs

use orderflow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult};
use tracing::{info, warn};

#[derive(Clone, Debug, Default)]
struct ReservationContext {
  stock_on_hand: i32,
  quantity: i32,
  reserved: bool,
  charged_cents: i64,
  card_declined: bool,
}

#[tokio::main]
async fn main() -> Result<(), FlowError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  let mut pipeline = Pipeline::<ReservationContext, FlowError>::new(&[
    ("reserve_stock", false, None),
    ("charge_card", false, None),
  ]);

  pipeline.on("reserve_stock", |ctx: ContextData<ReservationContext>| {
    Box::pin(async move {
      let mut data = ctx.write();
      if data.stock_on_hand < data.quantity {
        warn!(stock = data.stock_on_hand, "Not enough stock, stopping.");
        return Ok::<_, FlowError>(PipelineControl::Stop);
      }
      data.stock_on_hand -= data.quantity;
      data.reserved = true;
      info!(remaining = data.stock_on_hand, "Stock reserved.");
      Ok(PipelineControl::Continue)
    })
  });

  pipeline.compensate("reserve_stock", |ctx: ContextData<ReservationContext>| {
    Box::pin(async move {
      let mut data = ctx.write();
      data.stock_on_hand += data.quantity;
      data.reserved = false;
      info!(restored = data.stock_on_hand, "Reservation released.");
      Ok::<_, FlowError>(())
    })
  });

  pipeline.on("charge_card", |ctx: ContextData<ReservationContext>| {
    Box::pin(async move {
      let mut data = ctx.write();
      if data.card_declined {
        return Err(FlowError::Internal("card declined".into()));
      }
      data.charged_cents = i64::from(data.quantity) * 2000;
      Ok(PipelineControl::Continue)
    })
  });

  let happy = ContextData::new(ReservationContext {
    stock_on_hand: 5,
    quantity: 2,
    ..Default::default()
  });
  let outcome = pipeline.run(happy.clone()).await?;
  assert_eq!(outcome, PipelineResult::Completed);
  info!(charged = happy.read().charged_cents, "First order went through.");

  let declined = ContextData::new(ReservationContext {
    stock_on_hand: 5,
    quantity: 2,
    card_declined: true,
    ..Default::default()
  });
  let err = pipeline.run(declined.clone()).await.err();
  let data = declined.read();
  info!(?err, stock = data.stock_on_hand, reserved = data.reserved, "Second order was unwound.");
  assert_eq!(data.stock_on_hand, 5);

  Ok(())
}
