pub mod loan_requests;
