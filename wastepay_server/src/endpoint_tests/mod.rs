mod helpers;
mod orders;
mod payments;
mod wallets;
