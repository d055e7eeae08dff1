// Copyright 2025 Apirelay (https://github.com/apirelay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Local backup content for content-style services.
//!
//! Substitution is a caller-side policy layered on top of the gateway: when
//! a gateway result carries the total-failure message, the caller swaps in
//! a random pick from a small fixed list, tagged so it cannot be mistaken
//! for live data. The gateway itself knows nothing about backups.

use rand::seq::SliceRandom;

pub const BACKUP_QUOTES: &[&str] = &[
    "Success is not final, failure is not fatal: it is the courage to continue that counts. — Winston Churchill",
    "The only limit to our realization of tomorrow is our doubts of today. — Franklin D. Roosevelt",
    "Don't be afraid to give up the good to go for the great. — John D. Rockefeller",
    "The secret of success is constancy to purpose. — Benjamin Disraeli",
    "It always seems impossible until it's done. — Nelson Mandela",
];

pub const BACKUP_JOKES: &[&str] = &[
    "Why do programmers prefer dark mode? Because light attracts bugs!",
    "There are 10 kinds of people: those who understand binary and those who don't.",
    "Why do Java developers wear glasses? Because they can't C#!",
    "A programmer's three virtues: laziness, impatience, and hubris.",
    "Why do programmers confuse Halloween and Christmas? Because Oct 31 == Dec 25!",
];

pub const BACKUP_FACTS: &[&str] = &[
    "Honey never spoils. Archaeologists have found 3000-year-old honey in Egyptian tombs that is still edible.",
    "Octopuses have three hearts and blue blood.",
    "Bananas are berries, but strawberries are not.",
    "Sharks existed before trees: about 400 million years versus 385 million.",
    "A snail can sleep for three years.",
];

/// Marker appended to substituted content, distinguishing it from live data.
pub const BACKUP_PROVENANCE: &str = "(source: local backup library)";

/// Does a gateway result string indicate total failure?
///
/// Anchored to the exact shape of `gateway::unavailable_message`; live
/// content that merely mentions failure must never trigger substitution.
pub fn is_gateway_failure(result: &str) -> bool {
    result.starts_with("all endpoints for ") && result.ends_with("are unavailable, try again later")
}

/// Uniformly random pick from a backup list.
pub fn pick(entries: &'static [&'static str]) -> &'static str {
    entries
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("")
}

/// Replace a failed gateway result with tagged backup content; pass
/// successful results through untouched.
pub fn substitute(result: String, entries: &'static [&'static str], prefix: &str) -> String {
    if is_gateway_failure(&result) {
        format!("{} {}\n\n{}", prefix, pick(entries), BACKUP_PROVENANCE)
    } else {
        result
    }
}

/// Approximate static conversion rates behind the `backup://local-rates`
/// pseudo-endpoint. Reference data only, not live market rates.
pub fn local_rate(from: &str, to: &str) -> Option<f64> {
    let rate = match (from, to) {
        ("USD", "CNY") => 7.2,
        ("CNY", "USD") => 0.139,
        ("USD", "EUR") => 0.85,
        ("EUR", "USD") => 1.18,
        ("USD", "GBP") => 0.73,
        ("GBP", "USD") => 1.37,
        ("USD", "JPY") => 110.0,
        ("JPY", "USD") => 0.009,
        ("USD", "AUD") => 1.35,
        ("AUD", "USD") => 0.74,
        ("USD", "CAD") => 1.25,
        ("CAD", "USD") => 0.80,
        ("EUR", "CNY") => 8.5,
        ("CNY", "EUR") => 0.118,
        ("EUR", "GBP") => 0.86,
        ("GBP", "EUR") => 1.16,
        ("EUR", "JPY") => 130.0,
        ("JPY", "EUR") => 0.0077,
        ("GBP", "CNY") => 9.9,
        ("CNY", "GBP") => 0.101,
        ("GBP", "JPY") => 151.0,
        ("JPY", "GBP") => 0.0066,
        ("CNY", "JPY") => 15.3,
        ("JPY", "CNY") => 0.065,
        _ => return None,
    };
    Some(rate)
}
