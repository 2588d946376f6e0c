//! Static directory of doctors and hospitals.

use serde::Serialize;

/// A doctor available for consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Doctor {
    /// Full name including title.
    pub name: &'static str,
    /// Specialty.
    pub specialty: &'static str,
}

/// A hospital or health centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hospital {
    /// Display name.
    pub name: &'static str,
    /// Address or landmark.
    pub location: &'static str,
    /// Contact number.
    pub phone: &'static str,
    /// Whether it runs a 24-hour emergency ward.
    pub emergency: bool,
}

/// Doctors listed on the consultation screen.
pub const DOCTORS: &[Doctor] = &[
    Doctor {
        name: "Dr. Rajesh Kumar",
        specialty: "General Medicine",
    },
    Doctor {
        name: "Dr. Priya Sharma",
        specialty: "General Medicine",
    },
    Doctor {
        name: "Dr. Manjeet Singh",
        specialty: "General Medicine",
    },
];

/// Hospitals listed for referrals.
pub const HOSPITALS: &[Hospital] = &[
    Hospital {
        name: "Civil Hospital",
        location: "Village Center",
        phone: "+91-9876543210",
        emergency: true,
    },
    Hospital {
        name: "Primary Health Centre",
        location: "Block Office Road",
        phone: "108",
        emergency: false,
    },
];

/// Find a doctor by name, ignoring case and surrounding whitespace.
#[must_use]
pub fn find_doctor(name: &str) -> Option<&'static Doctor> {
    let name = name.trim();
    DOCTORS.iter().find(|d| d.name.eq_ignore_ascii_case(name))
}

/// Find a hospital by name, ignoring case and surrounding whitespace.
#[must_use]
pub fn find_hospital(name: &str) -> Option<&'static Hospital> {
    let name = name.trim();
    HOSPITALS.iter().find(|h| h.name.eq_ignore_ascii_case(name))
}
