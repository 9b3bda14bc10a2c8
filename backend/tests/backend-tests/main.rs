mod helpers;
mod welcome_email;
