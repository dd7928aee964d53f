use crate::models::booking::Booking;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("render failed: {0}")]
    Failed(String),
}

/// Turns a confirmed booking into a stored ticket document and
/// returns its location. Invoked fire-and-forget after confirmation;
/// a failure here is logged and never touches booking state.
#[async_trait]
pub trait TicketRenderer: Send + Sync {
    async fn render(&self, booking: &Booking) -> Result<String, RenderError>;
}

/// Writes a plain-text ticket under a configured directory. Stands in
/// for the real document pipeline at the same interface.
pub struct FileTicketRenderer {
    output_dir: PathBuf,
}

impl FileTicketRenderer {
    pub fn new(output_dir: PathBuf) -> Self {
        FileTicketRenderer { output_dir }
    }
}

#[async_trait]
impl TicketRenderer for FileTicketRenderer {
    async fn render(&self, booking: &Booking) -> Result<String, RenderError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let pnr = booking.pnr_number.as_deref().unwrap_or("UNASSIGNED");
        let passengers = booking
            .passengers
            .iter()
            .map(|p| {
                format!(
                    "  {} ({}, {}){}",
                    p.name,
                    p.age,
                    p.gender,
                    p.seat_number
                        .as_deref()
                        .map(|s| format!(", seat {}", s))
                        .unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let document = format!(
            "E-TICKET\nPNR: {}\nTrain: {} {} ({})\nRoute: {} -> {}\nDate: {}\nClass: {}\nPassengers:\n{}\nTotal fare: {} {}\n",
            pnr,
            booking.train.train_number,
            booking.train.train_name,
            booking.train.train_id,
            booking.train.from_station,
            booking.train.to_station,
            booking.train.journey_date,
            booking.train.selected_class,
            passengers,
            booking.total_fare,
            booking.payment.currency,
        );

        let path = self.output_dir.join(format!("{}.txt", booking.id));
        tokio::fs::write(&path, document).await?;

        Ok(path.to_string_lossy().into_owned())
    }
}
