#[rocket::launch]
fn launch() -> rocket::Rocket<rocket::Build> {
    meeting_pulse::rocket()
}
