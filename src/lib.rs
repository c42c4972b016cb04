pub mod alerting;
pub mod config;
pub mod db;
pub mod monitoring;
pub mod notifications;
pub mod realtime;
pub mod services;
pub mod web;
