//! Pharmacy catalog, medicine cart and booking.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::ClinicApi;
use crate::error::{Error, Result};
use crate::profile::UserProfile;

/// Stock of one medicine at one pharmacy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineStock {
    /// Units on hand.
    #[serde(default)]
    pub stock: u32,
    /// Price per unit in rupees.
    #[serde(default)]
    pub price: f64,
    /// Expiry date as published by the pharmacy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

/// A pharmacy and its inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pharmacy {
    /// Server id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Address or landmark.
    pub location: String,
    /// Contact number.
    pub phone: String,
    /// Inventory keyed by lowercase medicine name.
    #[serde(default)]
    pub medicines: BTreeMap<String, MedicineStock>,
}

/// Answer to "does this pharmacy have X?".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    /// Whether at least one unit is in stock.
    pub available: bool,
    /// Units on hand.
    pub stock: u32,
    /// Price per unit, if the medicine is listed.
    pub price: Option<f64>,
}

impl Pharmacy {
    /// Look up a medicine by name, ignoring case.
    #[must_use]
    pub fn availability(&self, medicine: &str) -> Availability {
        let key = medicine_key(medicine);
        let entry = self
            .medicines
            .get(&key)
            .or_else(|| {
                self.medicines
                    .iter()
                    .find(|(name, _)| medicine_key(name) == key)
                    .map(|(_, stock)| stock)
            });

        match entry {
            Some(m) => Availability {
                available: m.stock > 0,
                stock: m.stock,
                price: Some(m.price),
            },
            None => Availability {
                available: false,
                stock: 0,
                price: None,
            },
        }
    }
}

/// Built-in catalog shown when the pharmacy list can't be fetched.
#[must_use]
pub fn sample_catalog() -> Vec<Pharmacy> {
    let stock = |stock, price: f64, expiry: &str| MedicineStock {
        stock,
        price,
        expiry: Some(expiry.to_string()),
    };

    let medicines = BTreeMap::from([
        ("paracetamol".to_string(), stock(50, 10.0, "2025-12-31")),
        ("amoxicillin".to_string(), stock(30, 45.0, "2025-10-15")),
        ("metformin".to_string(), stock(25, 25.0, "2025-11-20")),
        ("aspirin".to_string(), stock(40, 8.0, "2025-09-30")),
    ]);

    vec![Pharmacy {
        id: "1".to_string(),
        name: "Civil Hospital Pharmacy".to_string(),
        location: "Civil Hospital, Village Center".to_string(),
        phone: "+91-9876543210".to_string(),
        medicines,
    }]
}

/// Fetch the pharmacy list, or fall back to [`sample_catalog`].
pub async fn list_pharmacies<A: ClinicApi + ?Sized>(api: &A) -> Vec<Pharmacy> {
    match api.list_pharmacies().await {
        Ok(pharmacies) => pharmacies,
        Err(e) => {
            warn!("Using built-in pharmacy catalog: {e}");
            sample_catalog()
        }
    }
}

/// One line of a medicine order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Medicine name.
    pub name: String,
    /// Units requested.
    pub quantity: u32,
    /// Price per unit.
    pub price: f64,
}

/// Medicines selected for booking, in the order they were first added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the quantity for a medicine. Zero removes the line.
    ///
    /// Names match the way [`Pharmacy::availability`] does, ignoring case and
    /// surrounding whitespace; an existing line keeps its first spelling.
    pub fn set_quantity(&mut self, name: &str, quantity: u32, price: f64) {
        let key = medicine_key(name);
        let position = self.lines.iter().position(|l| medicine_key(&l.name) == key);
        match (position, quantity) {
            (Some(i), 0) => {
                self.lines.remove(i);
            }
            (Some(i), q) => {
                self.lines[i].quantity = q;
                self.lines[i].price = price;
            }
            (None, 0) => {}
            (None, q) => self.lines.push(CartLine {
                name: name.trim().to_string(),
                quantity: q,
                price,
            }),
        }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of price times quantity.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.lines
            .iter()
            .map(|l| l.price * f64::from(l.quantity))
            .sum()
    }
}

/// Body of a medicine booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineRequestCreate {
    /// Requesting user.
    pub user_id: String,
    /// Name for the pickup slip.
    pub user_name: String,
    /// Number the pharmacy texts when ready.
    pub user_phone: String,
    /// Requested medicines.
    pub medicines: Vec<CartLine>,
    /// Target pharmacy.
    pub pharmacy_id: String,
}

/// A booking as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineRequest {
    /// Server id.
    pub id: String,
    /// Requesting user.
    pub user_id: String,
    /// Target pharmacy.
    pub pharmacy_id: String,
    /// Requested medicines.
    #[serde(default)]
    pub medicines: Vec<CartLine>,
    /// `pending`, `confirmed`, `ready` or `completed`.
    #[serde(default)]
    pub status: String,
    /// When the booking was made.
    #[serde(default, deserialize_with = "crate::timestamp::option::deserialize")]
    pub booking_date: Option<DateTime<Utc>>,
}

/// What happened to a medicine booking.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    /// The pharmacy has the request.
    Confirmed(MedicineRequest),
    /// The server was unreachable; the user should try again later.
    Offline,
}

/// Send the cart to a pharmacy.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the cart is empty. Remote failures are
/// reported as [`BookingOutcome::Offline`].
pub async fn book<A: ClinicApi + ?Sized>(
    api: &A,
    cart: &Cart,
    pharmacy_id: &str,
    user: &UserProfile,
) -> Result<BookingOutcome> {
    if cart.is_empty() {
        return Err(Error::invalid_input("cart", "select at least one medicine"));
    }

    let request = MedicineRequestCreate {
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        user_phone: user.phone.clone(),
        medicines: cart.lines().to_vec(),
        pharmacy_id: pharmacy_id.to_string(),
    };

    match api.book_medicines(&request).await {
        Ok(confirmed) => {
            info!(pharmacy_id, lines = cart.lines().len(), "Medicine booking confirmed");
            Ok(BookingOutcome::Confirmed(confirmed))
        }
        Err(e) => {
            warn!(pharmacy_id, "Medicine booking not sent: {e}");
            Ok(BookingOutcome::Offline)
        }
    }
}

fn medicine_key(name: &str) -> String {
    name.trim().to_lowercase()
}
