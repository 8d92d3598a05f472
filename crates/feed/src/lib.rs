pub mod deepseek;
pub mod eastmoney;
pub mod yahoo;
