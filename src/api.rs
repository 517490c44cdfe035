pub mod egauge;
